//! Injectable time source
//!
//! Quota resets and architect-session expiry depend on wall-clock time and
//! the local calendar day, so every store takes a [`SharedClock`] instead of
//! calling `Local::now()` directly.

use chrono::{DateTime, Duration, Local};
use std::sync::{Arc, Mutex};

pub type SharedClock = Arc<dyn Clock>;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Local calendar day as `YYYY-MM-DD`
    fn today_key(&self) -> String {
        date_key(&self.now())
    }
}

pub fn date_key(at: &DateTime<Local>) -> String {
    at.date_naive().format("%Y-%m-%d").to_string()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
