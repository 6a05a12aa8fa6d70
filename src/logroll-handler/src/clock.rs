//! Wall-clock source for time-based rotation.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Source of the current unix time, in whole seconds, and of the local
/// calendar that rotation boundaries are counted on.
///
/// The calendar methods default to the process time zone. Implementations
/// only override them to pin a zone, e.g. in tests.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> i64;

    /// Local wall-clock reading at unix timestamp `secs`.
    fn local(&self, secs: i64) -> NaiveDateTime {
        DateTime::from_timestamp(secs, 0)
            .unwrap_or_default()
            .with_timezone(&Local)
            .naive_local()
    }

    /// Earliest unix timestamp at which the local clock reads `local`.
    ///
    /// `None` when the reading is skipped by a forward offset change.
    fn resolve(&self, local: NaiveDateTime) -> Option<i64> {
        Local
            .from_local_datetime(&local)
            .earliest()
            .map(|t| t.timestamp())
    }
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to a writer.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(secs: i64) -> Self {
        Self {
            secs: Arc::new(AtomicI64::new(secs)),
        }
    }

    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }
}
