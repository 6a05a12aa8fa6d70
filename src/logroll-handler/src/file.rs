//! Lifecycle-tracked handle for the active log file.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::error::{FsOp, Result, RotateError};

/// Owned append-only handle to a log file.
///
/// Tracks whether it has been closed so callers can reject writes instead of
/// touching a released descriptor. Closing more than once is a no-op.
#[derive(Debug)]
pub struct LogFile {
    file: Option<File>,
    path: PathBuf,
}

impl LogFile {
    /// Open `path` for appending, creating it with `mode` if missing.
    ///
    /// `mode` is ignored on platforms without Unix permission bits.
    pub fn open(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.create(true).append(true);

        #[cfg(unix)]
        {
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = options
            .open(path)
            .map_err(|e| RotateError::fs(FsOp::Open, path, e))?;

        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
        })
    }

    /// Append all of `data`, returning the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or(RotateError::NotOpen)?;
        file.write_all(data)
            .map_err(|e| RotateError::fs(FsOp::Write, &self.path, e))?;
        Ok(data.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(RotateError::NotOpen)?;
        file.flush()
            .map_err(|e| RotateError::fs(FsOp::Flush, &self.path, e))
    }

    /// Current size of the file on disk.
    pub fn size(&self) -> Result<u64> {
        let file = self.file.as_ref().ok_or(RotateError::NotOpen)?;
        file.metadata()
            .map(|m| m.len())
            .map_err(|e| RotateError::fs(FsOp::Stat, &self.path, e))
    }

    /// Release the descriptor.
    pub fn close(&mut self) {
        self.file = None;
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

/// `path` with `.suffix` appended to its file name.
pub(crate) fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
