//! The writer contract shared by every rotation policy.

use std::io;
use std::path::Path;

use crate::error::Result;
use crate::size::SizeRotatingFile;
use crate::timed::TimedRotatingFile;

/// An append-only sink that rotates its file transparently.
///
/// Implementations serialize all calls on one instance, so a shared reference
/// can be handed to any number of threads.
pub trait RotatingWriter: Send + Sync {
    /// Append `data`, rotating first if the policy requires it.
    ///
    /// On success every byte landed in the (possibly new) active file.
    fn write(&self, data: &[u8]) -> Result<usize>;

    fn write_str(&self, data: &str) -> Result<usize> {
        self.write(data.as_bytes())
    }

    /// Release the active file. There is no reopen; build a new writer instead.
    fn close(&self) -> Result<()>;

    /// Absolute path of the active file.
    fn path(&self) -> &Path;

    fn is_closed(&self) -> bool;
}

/// Either kind of rotating writer, as built from configuration.
#[derive(Debug)]
pub enum RotatingFile {
    Timed(TimedRotatingFile),
    Size(SizeRotatingFile),
}

impl RotatingWriter for RotatingFile {
    fn write(&self, data: &[u8]) -> Result<usize> {
        match self {
            Self::Timed(w) => w.write(data),
            Self::Size(w) => w.write(data),
        }
    }

    fn close(&self) -> Result<()> {
        match self {
            Self::Timed(w) => w.close(),
            Self::Size(w) => w.close(),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Timed(w) => w.path(),
            Self::Size(w) => w.path(),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Timed(w) => w.is_closed(),
            Self::Size(w) => w.is_closed(),
        }
    }
}

impl io::Write for &RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            RotatingFile::Timed(w) => w.flush().map_err(io::Error::from),
            RotatingFile::Size(w) => w.flush().map_err(io::Error::from),
        }
    }
}

impl io::Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}
