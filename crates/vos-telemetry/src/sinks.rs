//! Abstract metrics reporting, decoupled from the concrete backend.

use once_cell::sync::OnceCell;

/// A no-op sink, used in tests or whenever telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the installed sink.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the installed metrics sink, or a no-op sink if none was installed.
pub fn metrics() -> &'static dyn MetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// The full set of metrics the engine instruments itself with.
pub trait MetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of committed transactions.
    fn inc_tx_commits(&self);
    /// Increments the counter of aborted transactions.
    fn inc_tx_aborts(&self);
    /// Observes the wall-clock duration of one transaction (commit or abort).
    fn observe_tx_duration(&self, duration_secs: f64);
    /// Increments the counter of `update` operations served.
    fn inc_updates_total(&self);
    /// Increments the counter of `fetch` operations served.
    fn inc_fetches_total(&self);
    /// Increments the counter of `punch` operations served.
    fn inc_punches_total(&self);
    /// Adds to the running total of bytes written through the BIO bridge.
    fn inc_bytes_written_total(&self, bytes: u64);
    /// Adds to the running total of bytes read through the BIO bridge.
    fn inc_bytes_read_total(&self, bytes: u64);
    /// Sets the gauge for the current number of hydrated objects in the handle cache.
    fn set_object_cache_size(&self, count: u64);
    /// Increments the counter of object handle cache evictions.
    fn inc_object_cache_evictions(&self);
    /// Increments the counter of sealed epochs dropped by garbage collection.
    fn inc_epochs_dropped(&self, count: u64);
    /// Increments a per-mnemonic counter every time a public operation surfaces an error.
    fn inc_error(&self, mnemonic: &'static str);
}

impl MetricsSink for NopSink {
    fn inc_tx_commits(&self) {}
    fn inc_tx_aborts(&self) {}
    fn observe_tx_duration(&self, _duration_secs: f64) {}
    fn inc_updates_total(&self) {}
    fn inc_fetches_total(&self) {}
    fn inc_punches_total(&self) {}
    fn inc_bytes_written_total(&self, _bytes: u64) {}
    fn inc_bytes_read_total(&self, _bytes: u64) {}
    fn set_object_cache_size(&self, _count: u64) {}
    fn inc_object_cache_evictions(&self) {}
    fn inc_epochs_dropped(&self, _count: u64) {}
    fn inc_error(&self, _mnemonic: &'static str) {}
}
