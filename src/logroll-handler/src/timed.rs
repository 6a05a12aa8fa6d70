//! Time-interval rotation.
//!
//! The active file is retired when the wall clock passes a deadline aligned to
//! local midnight. Boundaries are counted on the local calendar, so a day is a
//! calendar day even when an offset change makes it 23 or 25 hours long.
//! Retired files are named `{path}.{date}` after the start of the period they
//! cover, and only the newest `backup_count` of them are kept.
//!
//! There is no timer: the deadline is polled on each write, so a quiet period
//! produces no rotation until the next write arrives.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use logroll_utils_fs::{is_exist, is_file, list_dir};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{DEFAULT_BACKUP_COUNT, DEFAULT_INTERVAL, RotationUnit};
use crate::error::{FsOp, Result, RotateError};
use crate::file::{LogFile, backup_path};
use crate::permissions::default_file_mode;
use crate::suffix::DateSuffix;
use crate::writer::RotatingWriter;

/// Writer that rotates its file on interval boundaries.
#[derive(Debug)]
pub struct TimedRotatingFile {
    path: PathBuf,
    /// Directory scanned for dated backups.
    dir: PathBuf,
    /// `basename.`, the prefix every dated backup carries.
    prefix: String,
    mode: u32,
    unit: RotationUnit,
    suffix: DateSuffix,
    clock: Arc<dyn Clock>,
    state: Mutex<TimedState>,
}

#[derive(Debug)]
struct TimedState {
    handle: Option<LogFile>,
    /// Interval length in seconds.
    interval: i64,
    backup_count: usize,
    /// Local reading of the boundary that opened the current period.
    period_start: NaiveDateTime,
    rotate_at: i64,
}

/// One rotation period on the local calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Period {
    start: NaiveDateTime,
    /// Unix timestamp of the boundary that closes the period.
    rotate_at: i64,
}

/// What a rotation did. Logged only after the state lock is released, so the
/// writer can itself be the sink of a tracing subscriber.
#[derive(Debug)]
struct Rotation {
    backup: PathBuf,
    replaced: bool,
    renamed: bool,
    expired: Vec<PathBuf>,
    next_rotation_at: i64,
}

impl Rotation {
    fn log(&self, path: &Path) {
        if self.replaced {
            debug!(backup = %self.backup.display(), "Removed backup with the same date");
        }
        if !self.renamed {
            warn!(path = %path.display(), "Active log file missing at rotation, nothing to rename");
        }
        for old in &self.expired {
            debug!(backup = %old.display(), "Removed expired backup");
        }
        info!(
            path = %path.display(),
            backup = %self.backup.display(),
            next_rotation_at = self.next_rotation_at,
            "Rotated log file"
        );
    }
}

/// Builder for [`TimedRotatingFile`].
#[derive(Debug)]
pub struct TimedRotatingFileBuilder {
    path: PathBuf,
    unit: RotationUnit,
    interval: u32,
    backup_count: usize,
    date_format: Option<String>,
    mode: Option<u32>,
    clock: Arc<dyn Clock>,
}

impl TimedRotatingFileBuilder {
    /// Base unit of the interval. Also picks the default suffix format.
    pub fn unit(mut self, unit: RotationUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Number of units between rotations.
    pub fn interval(mut self, units: u32) -> Self {
        self.interval = units;
        self
    }

    /// Number of dated backups to keep; 0 keeps all of them.
    pub fn backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    /// Chrono format of the backup suffix. Must be fixed width.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Permission bits for created files, overriding the process default.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validate the configuration and open the file.
    ///
    /// Either returns a writer with an open file or no writer at all; a failed
    /// open is reported as [`RotateError::Construction`].
    pub fn open(self) -> Result<TimedRotatingFile> {
        let interval = interval_secs(self.unit, self.interval)?;
        let format = self
            .date_format
            .unwrap_or_else(|| self.unit.default_format().to_string());
        let suffix = DateSuffix::new(format)?;

        let path = std::path::absolute(&self.path).map_err(|e| {
            RotateError::construction(&self.path, RotateError::fs(FsOp::Stat, &self.path, e))
        })?;
        let (dir, prefix) = backup_scope(&path)?;
        let mode = self.mode.unwrap_or_else(default_file_mode);

        let handle = LogFile::open(&path, mode).map_err(|e| RotateError::construction(&path, e))?;
        let period = current_period(self.clock.as_ref(), self.clock.now(), interval);

        debug!(
            path = %path.display(),
            interval_secs = interval,
            backup_count = self.backup_count,
            rotate_at = period.rotate_at,
            "Opened timed rotating file"
        );

        Ok(TimedRotatingFile {
            path,
            dir,
            prefix,
            mode,
            unit: self.unit,
            suffix,
            clock: self.clock,
            state: Mutex::new(TimedState {
                handle: Some(handle),
                interval,
                backup_count: self.backup_count,
                period_start: period.start,
                rotate_at: period.rotate_at,
            }),
        })
    }
}

impl TimedRotatingFile {
    /// Open `path` with daily rotation and 31 retained backups.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(path).open()
    }

    pub fn builder(path: impl Into<PathBuf>) -> TimedRotatingFileBuilder {
        TimedRotatingFileBuilder {
            path: path.into(),
            unit: RotationUnit::default(),
            interval: DEFAULT_INTERVAL,
            backup_count: DEFAULT_BACKUP_COUNT,
            date_format: None,
            mode: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Append `data`, rotating first if the deadline has passed.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.handle.is_none() {
            return Err(RotateError::NotOpen);
        }

        let rotation = if self.clock.now() >= state.rotate_at {
            Some(self.rotate(&mut state)?)
        } else {
            None
        };

        let written = state
            .handle
            .as_mut()
            .ok_or(RotateError::NotOpen)?
            .write(data);
        drop(state);

        if let Some(rotation) = rotation {
            rotation.log(&self.path);
        }
        written
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

    /// Close the file. Writes and further closes fail with `NotOpen` afterwards.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let mut handle = state.handle.take().ok_or(RotateError::NotOpen)?;
        handle.close();
        drop(state);

        debug!(path = %self.path.display(), "Closed timed rotating file");
        Ok(())
    }

    /// Set the number of units between rotations and recompute the deadline.
    ///
    /// Backups that already exist keep their names.
    pub fn set_interval(&self, units: u32) -> Result<()> {
        let interval = interval_secs(self.unit, units)?;
        let mut state = self.state.lock();
        let period = current_period(self.clock.as_ref(), self.clock.now(), interval);
        state.interval = interval;
        state.period_start = period.start;
        state.rotate_at = period.rotate_at;
        drop(state);

        debug!(
            path = %self.path.display(),
            interval_secs = interval,
            rotate_at = period.rotate_at,
            "Rotation interval changed"
        );
        Ok(())
    }

    /// Number of dated backups to keep from the next rotation on; 0 keeps all.
    pub fn set_backup_count(&self, count: usize) {
        self.state.lock().backup_count = count;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unix timestamp at or after which the next write rotates.
    pub fn rotate_at(&self) -> i64 {
        self.state.lock().rotate_at
    }

    /// Interval length in seconds.
    pub fn interval(&self) -> i64 {
        self.state.lock().interval
    }

    pub fn backup_count(&self) -> usize {
        self.state.lock().backup_count
    }

    pub fn date_format(&self) -> &str {
        self.suffix.format_str()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().handle.is_none()
    }

    fn rotate(&self, state: &mut TimedState) -> Result<Rotation> {
        if let Some(mut handle) = state.handle.take() {
            handle.close();
        }

        let backup = backup_path(&self.path, &self.suffix.render(state.period_start));

        let replaced = is_exist(&backup);
        if replaced {
            fs::remove_file(&backup).map_err(|e| RotateError::fs(FsOp::Remove, &backup, e))?;
        }

        let renamed = is_file(&self.path);
        if renamed {
            fs::rename(&self.path, &backup)
                .map_err(|e| RotateError::fs(FsOp::Rename, &self.path, e))?;
        }

        let mut expired = Vec::new();
        if state.backup_count > 0 {
            for old in self.expired_backups(state.backup_count)? {
                fs::remove_file(&old).map_err(|e| RotateError::fs(FsOp::Remove, &old, e))?;
                expired.push(old);
            }
        }

        let period = current_period(self.clock.as_ref(), self.clock.now(), state.interval);
        state.period_start = period.start;
        state.rotate_at = period.rotate_at;
        state.handle = Some(LogFile::open(&self.path, self.mode)?);

        Ok(Rotation {
            backup,
            replaced,
            renamed,
            expired,
            next_rotation_at: state.rotate_at,
        })
    }

    /// Dated backups beyond the newest `keep`, oldest first.
    fn expired_backups(&self, keep: usize) -> Result<Vec<PathBuf>> {
        let mut backups: Vec<String> = list_dir(&self.dir)
            .map_err(|e| RotateError::fs(FsOp::ListDir, &self.dir, e))?
            .into_iter()
            .filter(|name| {
                name.strip_prefix(&self.prefix)
                    .is_some_and(|suffix| self.suffix.matches(suffix))
            })
            .collect();

        if backups.len() <= keep {
            return Ok(Vec::new());
        }
        backups.sort();
        let excess = backups.len() - keep;

        Ok(backups
            .into_iter()
            .take(excess)
            .map(|name| self.dir.join(name))
            .collect())
    }
}

fn interval_secs(unit: RotationUnit, units: u32) -> Result<i64> {
    if units == 0 {
        return Err(RotateError::InvalidConfig(
            "rotation interval must be at least one unit".to_string(),
        ));
    }
    Ok(i64::from(units) * unit.secs())
}

/// Directory holding the dated backups of `path` and the prefix they share.
///
/// Backups are found by name, so the file name must be valid UTF-8.
fn backup_scope(path: &Path) -> Result<(PathBuf, String)> {
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        RotateError::InvalidConfig(format!(
            "log file name of {} must be valid UTF-8",
            path.display()
        ))
    })?;
    let dir = path.parent().ok_or_else(|| {
        RotateError::InvalidConfig(format!("{} has no parent directory", path.display()))
    })?;
    Ok((dir.to_path_buf(), format!("{name}.")))
}

/// The period containing `now`.
///
/// Boundaries are local midnight plus whole multiples of `interval`, stepped on
/// the wall clock rather than in elapsed seconds.
fn current_period(clock: &dyn Clock, now: i64, interval: i64) -> Period {
    let step = TimeDelta::seconds(interval);
    let local = clock.local(now);
    let midnight = local.date().and_time(NaiveTime::MIN);
    let elapsed = (local - midnight).num_seconds();
    let mut end = midnight + TimeDelta::seconds((elapsed / interval + 1) * interval);

    loop {
        let rotate_at = resolve_boundary(clock, end);
        if rotate_at > now {
            return Period {
                start: end - step,
                rotate_at,
            };
        }
        end += step;
    }
}

/// First unix timestamp at which the local clock reads `boundary` or later.
fn resolve_boundary(clock: &dyn Clock, boundary: NaiveDateTime) -> i64 {
    // A reading skipped by a forward offset change resolves to the gap's end.
    let mut reading = boundary;
    for _ in 0..=24 * 60 {
        if let Some(secs) = clock.resolve(reading) {
            return secs;
        }
        reading += TimeDelta::minutes(1);
    }
    boundary.and_utc().timestamp()
}

impl RotatingWriter for TimedRotatingFile {
    fn write(&self, data: &[u8]) -> Result<usize> {
        TimedRotatingFile::write(self, data)
    }

    fn close(&self) -> Result<()> {
        TimedRotatingFile::close(self)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_closed(&self) -> bool {
        TimedRotatingFile::is_closed(self)
    }
}

impl io::Write for &TimedRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TimedRotatingFile::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        TimedRotatingFile::flush(*self).map_err(io::Error::from)
    }
}

impl io::Write for TimedRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}
