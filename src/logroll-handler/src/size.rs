//! Size-based rotation over a numbered backup ladder.
//!
//! Before a write that would push the active file past `max_bytes`, the ladder
//! `{path}.1 … {path}.N` shifts up one slot (the top entry falls off), the
//! active file becomes `{path}.1`, and a fresh file is opened. Writes are never
//! split across files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logroll_utils_fs::is_exist;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{FsOp, Result, RotateError};
use crate::file::{LogFile, backup_path};
use crate::permissions::default_file_mode;
use crate::writer::RotatingWriter;

/// Writer that rotates its file when it would grow past a byte limit.
#[derive(Debug)]
pub struct SizeRotatingFile {
    path: PathBuf,
    mode: u32,
    max_bytes: u64,
    state: Mutex<SizeState>,
}

#[derive(Debug)]
struct SizeState {
    handle: Option<LogFile>,
    /// Bytes in the active file, seeded from its size on open.
    written: u64,
    backup_count: usize,
}

/// Builder for [`SizeRotatingFile`].
#[derive(Debug)]
pub struct SizeRotatingFileBuilder {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    mode: Option<u32>,
}

impl SizeRotatingFileBuilder {
    /// Number of numbered backups to keep; 0 never discards any.
    pub fn backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    /// Permission bits for created files, overriding the process default.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Validate the configuration and open the file.
    ///
    /// A failed open is reported as [`RotateError::Construction`] and yields no
    /// writer.
    pub fn open(self) -> Result<SizeRotatingFile> {
        if self.max_bytes == 0 {
            return Err(RotateError::InvalidConfig(
                "max_bytes must be greater than zero".to_string(),
            ));
        }

        let path = std::path::absolute(&self.path).map_err(|e| {
            RotateError::construction(&self.path, RotateError::fs(FsOp::Stat, &self.path, e))
        })?;
        let mode = self.mode.unwrap_or_else(default_file_mode);

        let (handle, written) =
            open_measured(&path, mode).map_err(|e| RotateError::construction(&path, e))?;

        debug!(
            path = %path.display(),
            max_bytes = self.max_bytes,
            backup_count = self.backup_count,
            written,
            "Opened size rotating file"
        );

        Ok(SizeRotatingFile {
            path,
            mode,
            max_bytes: self.max_bytes,
            state: Mutex::new(SizeState {
                handle: Some(handle),
                written,
                backup_count: self.backup_count,
            }),
        })
    }
}

impl SizeRotatingFile {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> Result<Self> {
        Self::builder(path, max_bytes)
            .backup_count(backup_count)
            .open()
    }

    pub fn builder(path: impl Into<PathBuf>, max_bytes: u64) -> SizeRotatingFileBuilder {
        SizeRotatingFileBuilder {
            path: path.into(),
            max_bytes,
            backup_count: 0,
            mode: None,
        }
    }

    /// Append `data`, rotating first if it would not fit under `max_bytes`.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.handle.as_ref().is_none_or(LogFile::is_closed) {
            return Err(RotateError::NotOpen);
        }

        let shifted = if state.written + data.len() as u64 > self.max_bytes {
            Some(self.rotate(&mut state)?)
        } else {
            None
        };

        let result = state
            .handle
            .as_mut()
            .ok_or(RotateError::NotOpen)?
            .write(data);
        record_write(&mut state, &result);
        drop(state);

        // Logged outside the lock so the writer can back a tracing subscriber.
        if let Some(shifted) = shifted {
            info!(
                path = %self.path.display(),
                shifted,
                "Rotated log file"
            );
        }
        result
    }

    pub fn write_str(&self, data: &str) -> Result<usize> {
        self.write(data.as_bytes())
    }

    pub fn flush(&self) -> Result<()> {
        self.state
            .lock()
            .handle
            .as_mut()
            .ok_or(RotateError::NotOpen)?
            .flush()
    }

    /// Close the file. Closing an already closed writer does nothing.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let closed = match state.handle.take() {
            Some(mut handle) => {
                handle.close();
                true
            }
            None => false,
        };
        drop(state);

        if closed {
            debug!(path = %self.path.display(), "Closed size rotating file");
        }
        Ok(())
    }

    /// Number of numbered backups to keep from the next rotation on.
    pub fn set_backup_count(&self, count: usize) {
        self.state.lock().backup_count = count;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn backup_count(&self) -> usize {
        self.state.lock().backup_count
    }

    /// Bytes currently in the active file.
    pub fn written(&self) -> u64 {
        self.state.lock().written
    }

    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .handle
            .as_ref()
            .is_none_or(LogFile::is_closed)
    }

    /// Returns how many existing backups moved up a slot.
    fn rotate(&self, state: &mut SizeState) -> Result<usize> {
        if let Some(mut handle) = state.handle.take() {
            handle.close();
        }

        let slots = match state.backup_count {
            // Unlimited: grow the ladder by one so nothing falls off.
            0 => self.ladder_len() + 1,
            count => count,
        };
        let shifted = self.shift_ladder(slots)?;

        let first = backup_path(&self.path, "1");
        if is_exist(&first) {
            remove(&first)?;
        }
        if is_exist(&self.path) {
            rename(&self.path, &first)?;
        }

        let (handle, written) = open_measured(&self.path, self.mode)?;
        state.handle = Some(handle);
        state.written = written;
        Ok(shifted)
    }

    /// Move `.i` to `.i+1` for `i` in `slots-1 ..= 1`, replacing whatever sits
    /// in the target slot.
    fn shift_ladder(&self, slots: usize) -> Result<usize> {
        let mut shifted = 0;
        for i in (1..slots).rev() {
            let src = backup_path(&self.path, &i.to_string());
            if !is_exist(&src) {
                continue;
            }
            let dst = backup_path(&self.path, &(i + 1).to_string());
            if is_exist(&dst) {
                remove(&dst)?;
            }
            rename(&src, &dst)?;
            shifted += 1;
        }
        Ok(shifted)
    }

    /// Highest `n` such that `.1` through `.n` all exist.
    fn ladder_len(&self) -> usize {
        (1..)
            .take_while(|i: &usize| is_exist(backup_path(&self.path, &i.to_string())))
            .count()
    }
}

/// Account for a write. A failed write may still have landed some bytes, so
/// the counter is taken from the file itself.
fn record_write(state: &mut SizeState, result: &Result<usize>) {
    match result {
        Ok(n) => state.written += *n as u64,
        Err(_) => {
            if let Some(size) = state.handle.as_ref().and_then(|h| h.size().ok()) {
                state.written = size;
            }
        }
    }
}

fn open_measured(path: &Path, mode: u32) -> Result<(LogFile, u64)> {
    let handle = LogFile::open(path, mode)?;
    let size = handle.size()?;
    Ok((handle, size))
}

fn remove(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| RotateError::fs(FsOp::Remove, path, e))
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| RotateError::fs(FsOp::Rename, from, e))
}

impl RotatingWriter for SizeRotatingFile {
    fn write(&self, data: &[u8]) -> Result<usize> {
        SizeRotatingFile::write(self, data)
    }

    fn close(&self) -> Result<()> {
        SizeRotatingFile::close(self)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_closed(&self) -> bool {
        SizeRotatingFile::is_closed(self)
    }
}

impl io::Write for &SizeRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SizeRotatingFile::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        SizeRotatingFile::flush(*self).map_err(io::Error::from)
    }
}

impl io::Write for SizeRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}
