//! Configuration for rotating writers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::size::SizeRotatingFile;
use crate::suffix::DAY_FORMAT;
use crate::timed::TimedRotatingFile;
use crate::writer::RotatingFile;

// ============================================================================
// Constants
// ============================================================================

/// Default number of retained backups for time-based rotation.
pub const DEFAULT_BACKUP_COUNT: usize = 31;

/// Default number of units between time-based rotations.
pub const DEFAULT_INTERVAL: u32 = 1;

/// Seconds in one day, the base unit of time-based rotation.
pub const DAY_SECS: i64 = 24 * 60 * 60;

// ============================================================================
// Policy
// ============================================================================

/// Base unit of a time-based rotation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationUnit {
    Minute,
    Hour,
    #[default]
    Day,
}

impl RotationUnit {
    /// Length of one unit in seconds.
    pub fn secs(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 60 * 60,
            Self::Day => DAY_SECS,
        }
    }

    /// Fixed-width suffix format used when none is configured.
    pub fn default_format(self) -> &'static str {
        match self {
            Self::Minute => "%Y-%m-%d_%H-%M",
            Self::Hour => "%Y-%m-%d_%H",
            Self::Day => DAY_FORMAT,
        }
    }
}

/// When to rotate and how many retired files to keep.
///
/// A `backup_count` of 0 means unlimited retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RotationPolicy {
    /// Rotate when the wall clock crosses an interval boundary.
    Timed {
        #[serde(default)]
        unit: RotationUnit,
        /// Number of units per interval.
        #[serde(default = "default_interval")]
        interval: u32,
        /// Suffix format; defaults to the unit's format.
        #[serde(default)]
        date_format: Option<String>,
        #[serde(default = "default_backup_count")]
        backup_count: usize,
    },
    /// Rotate before a write would push the file past `max_bytes`.
    Size { max_bytes: u64, backup_count: usize },
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL
}

fn default_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::Timed {
            unit: RotationUnit::Day,
            interval: DEFAULT_INTERVAL,
            date_format: None,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

// ============================================================================
// Writer configuration
// ============================================================================

/// Everything needed to open a rotating writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatingFileConfig {
    /// Active log file; relative paths are resolved on open.
    pub path: PathBuf,

    #[serde(default)]
    pub policy: RotationPolicy,

    /// Permission bits for created files; the process default when unset.
    #[serde(default)]
    pub mode: Option<u32>,
}

impl RotatingFileConfig {
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Open the configured writer.
    ///
    /// A failure to open the file is a [`RotateError::Construction`](crate::RotateError::Construction).
    pub fn open(&self) -> Result<RotatingFile> {
        match &self.policy {
            RotationPolicy::Timed {
                unit,
                interval,
                date_format,
                backup_count,
            } => {
                let mut builder = TimedRotatingFile::builder(&self.path)
                    .unit(*unit)
                    .interval(*interval)
                    .backup_count(*backup_count);
                if let Some(format) = date_format {
                    builder = builder.date_format(format.clone());
                }
                if let Some(mode) = self.mode {
                    builder = builder.mode(mode);
                }
                builder.open().map(RotatingFile::Timed)
            }
            RotationPolicy::Size {
                max_bytes,
                backup_count,
            } => {
                let mut builder =
                    SizeRotatingFile::builder(&self.path, *max_bytes).backup_count(*backup_count);
                if let Some(mode) = self.mode {
                    builder = builder.mode(mode);
                }
                builder.open().map(RotatingFile::Size)
            }
        }
    }
}
