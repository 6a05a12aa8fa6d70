//! Filesystem helpers for logroll.
//!
//! Narrow predicates and a directory listing that the rotation engine relies
//! on when it moves files around:
//! - [`is_exist`] - something (file, directory, anything) lives at a path
//! - [`is_file`] - the path is a regular file
//! - [`list_dir`] - plain entry names of a directory

use std::io;
use std::path::Path;

/// Check whether anything exists at `path`.
///
/// Dangling symlinks count as absent, matching `stat` semantics.
pub fn is_exist(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path).is_ok()
}

/// Check whether `path` is a regular file (following symlinks).
pub fn is_file(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file())
}

/// List the entry names of a directory.
///
/// Returns plain file names, not full paths, in the order the OS yields them.
/// Names that are not valid UTF-8 are skipped.
///
/// # Errors
///
/// Fails if the directory cannot be read or an entry cannot be inspected.
pub fn list_dir(dir: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}
