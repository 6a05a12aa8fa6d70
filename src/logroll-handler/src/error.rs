//! Error types for logroll-handler.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem operation that failed during open, write or rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    Open,
    Write,
    Flush,
    Stat,
    Rename,
    Remove,
    ListDir,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Write => "write",
            Self::Flush => "flush",
            Self::Stat => "stat",
            Self::Rename => "rename",
            Self::Remove => "remove",
            Self::ListDir => "list directory",
        };
        f.write_str(name)
    }
}

/// Rotating writer error types.
#[derive(Debug, Error)]
pub enum RotateError {
    /// The writer has no open file (closed, or a rotation failed to reopen it).
    #[error("The file is not opened")]
    NotOpen,

    /// An OS call failed while touching the log file or its backups.
    #[error("Failed to {op} {}: {source}", .path.display())]
    Filesystem {
        op: FsOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The initial open at construction time failed.
    ///
    /// No writer instance exists after this error; callers are expected to
    /// abort startup rather than retry.
    #[error("Cannot construct rotating writer for {}: {source}", .path.display())]
    Construction {
        path: PathBuf,
        #[source]
        source: Box<RotateError>,
    },

    /// Invalid writer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RotateError {
    pub(crate) fn fs(op: FsOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn construction(path: impl Into<PathBuf>, source: RotateError) -> Self {
        Self::Construction {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error must be treated as fatal by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }
}

impl From<RotateError> for io::Error {
    fn from(err: RotateError) -> Self {
        let kind = match &err {
            RotateError::NotOpen => io::ErrorKind::BrokenPipe,
            RotateError::Filesystem { source, .. } => source.kind(),
            RotateError::Construction { .. } => io::ErrorKind::Other,
            RotateError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

/// Result type for rotating writer operations.
pub type Result<T> = std::result::Result<T, RotateError>;
