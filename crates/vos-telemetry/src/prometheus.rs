//! A concrete implementation of [`crate::sinks::MetricsSink`] using `prometheus`.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec, Gauge,
    Histogram, IntCounter, IntCounterVec,
};

static TX_COMMITS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static TX_ABORTS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static TX_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static UPDATES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static FETCHES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PUNCHES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static BYTES_WRITTEN_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static BYTES_READ_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static OBJECT_CACHE_SIZE: OnceCell<Gauge> = OnceCell::new();
static OBJECT_CACHE_EVICTIONS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static EPOCHS_DROPPED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Unwraps a registered metric cell, panicking if `install()` was never called.
/// Using the sink before installation is a setup bug, not a runtime condition
/// callers can recover from, so this is exempted from the crate's no-panic lint.
#[allow(clippy::expect_used)]
fn expect_installed<T>(cell: &OnceCell<T>) -> &T {
    cell.get()
        .expect("prometheus sink not initialized; call vos_telemetry::prometheus::install()")
}

macro_rules! get_metric {
    ($metric:ident) => {
        expect_installed(&$metric)
    };
}

impl MetricsSink for PrometheusSink {
    fn inc_tx_commits(&self) {
        get_metric!(TX_COMMITS_TOTAL).inc();
    }
    fn inc_tx_aborts(&self) {
        get_metric!(TX_ABORTS_TOTAL).inc();
    }
    fn observe_tx_duration(&self, duration_secs: f64) {
        get_metric!(TX_DURATION_SECONDS).observe(duration_secs);
    }
    fn inc_updates_total(&self) {
        get_metric!(UPDATES_TOTAL).inc();
    }
    fn inc_fetches_total(&self) {
        get_metric!(FETCHES_TOTAL).inc();
    }
    fn inc_punches_total(&self) {
        get_metric!(PUNCHES_TOTAL).inc();
    }
    fn inc_bytes_written_total(&self, bytes: u64) {
        get_metric!(BYTES_WRITTEN_TOTAL).inc_by(bytes);
    }
    fn inc_bytes_read_total(&self, bytes: u64) {
        get_metric!(BYTES_READ_TOTAL).inc_by(bytes);
    }
    fn set_object_cache_size(&self, count: u64) {
        get_metric!(OBJECT_CACHE_SIZE).set(count as f64);
    }
    fn inc_object_cache_evictions(&self) {
        get_metric!(OBJECT_CACHE_EVICTIONS_TOTAL).inc();
    }
    fn inc_epochs_dropped(&self, count: u64) {
        get_metric!(EPOCHS_DROPPED_TOTAL).inc_by(count);
    }
    fn inc_error(&self, mnemonic: &'static str) {
        get_metric!(ERRORS_TOTAL).with_label_values(&[mnemonic]).inc();
    }
}

/// Registers all VOS metrics collectors and returns a static reference to the
/// sink. Must be called exactly once, before the sink is ever read.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    TX_COMMITS_TOTAL
        .set(register_int_counter!(
            "vos_tx_commits_total",
            "Total number of committed VOS transactions."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    TX_ABORTS_TOTAL
        .set(register_int_counter!(
            "vos_tx_aborts_total",
            "Total number of aborted VOS transactions."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    TX_DURATION_SECONDS
        .set(register_histogram!(
            "vos_tx_duration_seconds",
            "Wall-clock duration of a VOS transaction (commit or abort)."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    UPDATES_TOTAL
        .set(register_int_counter!(
            "vos_updates_total",
            "Total number of update operations served."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    FETCHES_TOTAL
        .set(register_int_counter!(
            "vos_fetches_total",
            "Total number of fetch operations served."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    PUNCHES_TOTAL
        .set(register_int_counter!(
            "vos_punches_total",
            "Total number of punch operations served."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    BYTES_WRITTEN_TOTAL
        .set(register_int_counter!(
            "vos_bytes_written_total",
            "Total bytes written through the BIO bridge."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    BYTES_READ_TOTAL
        .set(register_int_counter!(
            "vos_bytes_read_total",
            "Total bytes read through the BIO bridge."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    OBJECT_CACHE_SIZE
        .set(register_gauge!(
            "vos_object_cache_size",
            "Current number of hydrated objects held in the handle cache."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    OBJECT_CACHE_EVICTIONS_TOTAL
        .set(register_int_counter!(
            "vos_object_cache_evictions_total",
            "Total number of object handle cache evictions."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    EPOCHS_DROPPED_TOTAL
        .set(register_int_counter!(
            "vos_epochs_dropped_total",
            "Total number of sealed epochs dropped by garbage collection."
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "vos_errors_total",
            "Total number of errors surfaced by public VOS operations, by mnemonic.",
            &["mnemonic"]
        )?)
        .map_err(|_| prometheus::Error::AlreadyReg)?;

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
