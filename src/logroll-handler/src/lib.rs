//! Rotating log-file writers.
//!
//! Append-only sinks that retire their file when a policy threshold is
//! crossed and keep a bounded number of retired files around.
//!
//! # Features
//!
//! - **Time rotation**: rotate on minute/hour/day boundaries counted from local
//!   midnight, naming backups `{path}.{date}` and pruning the oldest
//! - **Size rotation**: rotate before a write would exceed a byte limit,
//!   shifting a numbered ladder `{path}.1 … {path}.N`
//! - **Thread safety**: one lock per writer serializes writes, rotations,
//!   setters and close
//! - **Plain `io::Write`**: `&writer` implements `std::io::Write`, so a writer
//!   can sit behind any logging front end
//!
//! # Example
//!
//! ```rust,no_run
//! use logroll_handler::{SizeRotatingFile, TimedRotatingFile};
//!
//! let daily = TimedRotatingFile::builder("/var/log/app/app.log")
//!     .backup_count(7)
//!     .open()
//!     .expect("cannot open log file");
//! daily.write_str("started\n").expect("write failed");
//!
//! let sized = SizeRotatingFile::new("/var/log/app/access.log", 10 * 1024 * 1024, 5)
//!     .expect("cannot open log file");
//! sized.write(b"GET /\n").expect("write failed");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod file;
pub mod permissions;
pub mod size;
pub mod suffix;
pub mod timed;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DAY_SECS, DEFAULT_BACKUP_COUNT, DEFAULT_INTERVAL, RotatingFileConfig, RotationPolicy,
    RotationUnit,
};
pub use error::{FsOp, Result, RotateError};
pub use file::LogFile;
pub use permissions::{
    DEFAULT_FILE_MODE, default_file_mode, reset_default_file_mode, set_default_file_mode,
};
pub use size::{SizeRotatingFile, SizeRotatingFileBuilder};
pub use suffix::{DAY_FORMAT, DateSuffix};
pub use timed::{TimedRotatingFile, TimedRotatingFileBuilder};
pub use writer::{RotatingFile, RotatingWriter};
