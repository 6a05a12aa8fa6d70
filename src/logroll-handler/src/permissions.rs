//! Process-wide default permission bits for log files.
//!
//! Writers read the default once, when they are constructed. Changing it
//! afterwards only affects writers constructed later; files that already exist
//! keep whatever mode they were created with.

use std::sync::atomic::{AtomicU32, Ordering};

/// Default permission bits for newly created log files (`rw-r--r--`).
pub const DEFAULT_FILE_MODE: u32 = 0o644;

static FILE_MODE: AtomicU32 = AtomicU32::new(DEFAULT_FILE_MODE);

/// Current process-wide default mode for new log files.
pub fn default_file_mode() -> u32 {
    FILE_MODE.load(Ordering::Relaxed)
}

/// Replace the process-wide default mode for new log files.
///
/// Call this during startup, before constructing writers. Only the permission
/// bits (`0o7777`) are kept. The process umask still applies on creation.
pub fn set_default_file_mode(mode: u32) {
    FILE_MODE.store(mode & 0o7777, Ordering::Relaxed);
}

/// Restore the built-in default mode.
pub fn reset_default_file_mode() {
    set_default_file_mode(DEFAULT_FILE_MODE);
}
