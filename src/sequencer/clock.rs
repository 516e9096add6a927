// Wall-clock sources for the transport
// The transport never reads system time directly; a Clock is injected

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic millisecond time source
pub trait Clock: Send {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> f64;
}

/// Monotonic system clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock, shared between clones
///
/// Used for offline stepping and tests: keep one handle, give a clone to the
/// transport, then `advance` the kept handle.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `ms` milliseconds (negative values are ignored)
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.micros
                .fetch_add((ms * 1000.0).round() as u64, Ordering::Relaxed);
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1000.0
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.elapsed_ms()
    }
}
