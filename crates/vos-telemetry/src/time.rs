//! A small RAII timer for observing the duration of a scope.

use std::time::Instant;

/// Observes the wall-clock duration of its own lifetime via
/// [`crate::sinks::MetricsSink::observe_tx_duration`] when dropped.
///
/// ```ignore
/// let _timer = Timer::start();
/// // ... do the transaction work ...
/// // duration recorded automatically when `_timer` goes out of scope.
/// ```
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        crate::metrics().observe_tx_duration(self.start.elapsed().as_secs_f64());
    }
}
