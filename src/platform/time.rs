//! Wall-clock time in JavaScript milliseconds
//!
//! Timestamps are `f64` milliseconds since the Unix epoch, the same unit
//! `Date.now()` returns, so envelopes written by either side agree.

use std::cell::Cell;
use std::rc::Rc;

/// Source of the current time
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> f64;
}

/// Real time from the host platform
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_millis(&self) -> f64 {
        js_sys::Date::now()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_millis(&self) -> f64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}

/// Manually driven clock for tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and advance the clock seen by a `StorageManager`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_millis: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_millis)),
        }
    }

    pub fn set(&self, millis: f64) {
        self.now.set(millis);
    }

    pub fn advance(&self, millis: f64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> f64 {
        self.now.get()
    }
}

/// Format epoch milliseconds like `Date.prototype.toISOString`
/// (`2024-05-01T09:30:00.000Z`).
pub fn iso_timestamp(millis: f64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
