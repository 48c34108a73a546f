//! Time origin providers.

use chrono::Utc;
use std::cell::Cell;
use std::time::Instant;

/// Host clock used to anchor [`TimeValue`](super::TimeValue)s.
///
/// Mirrors a browser performance timeline: `time_origin` is the wall-clock
/// moment (ms since the Unix epoch) the relative timeline starts at, and
/// `now` is the number of milliseconds elapsed since then. Either may be
/// unavailable on a host that lacks a high-resolution clock.
pub trait TimeSource {
    fn time_origin(&self) -> Option<f64>;

    fn now(&self) -> Option<f64>;

    /// Whether the source can anchor time values at all.
    fn is_available(&self) -> bool {
        self.time_origin().is_some()
    }
}

/// Process clock: wall-clock origin captured at construction, monotonic
/// elapsed time after that.
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin_ms: f64,
    started: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin_ms: Utc::now().timestamp_micros() as f64 / 1000.0,
            started: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn time_origin(&self) -> Option<f64> {
        Some(self.origin_ms)
    }

    fn now(&self) -> Option<f64> {
        Some(self.started.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Clock driven by the caller.
///
/// Hosts that already own a performance timeline forward it here; tests use
/// it to pin time. [`ManualTimeSource::unavailable`] models a host with no
/// time origin.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    origin: Option<f64>,
    now: Cell<f64>,
}

impl ManualTimeSource {
    /// Create a source anchored at `origin` (ms since the Unix epoch).
    pub fn new(origin: f64) -> Self {
        Self {
            origin: Some(origin),
            now: Cell::new(0.0),
        }
    }

    /// A source with no origin; every time value built from it fails.
    pub fn unavailable() -> Self {
        Self {
            origin: None,
            now: Cell::new(0.0),
        }
    }

    /// Set the current relative time in milliseconds.
    pub fn set_now(&self, relative_ms: f64) {
        self.now.set(relative_ms);
    }

    /// Move the current relative time forward by `delta_ms`.
    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl TimeSource for ManualTimeSource {
    fn time_origin(&self) -> Option<f64> {
        self.origin
    }

    fn now(&self) -> Option<f64> {
        self.origin.map(|_| self.now.get())
    }
}
