#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

//! # VOS Telemetry
//!
//! Observability infrastructure for the Versioned Object Store: structured
//! logging initialization, a Prometheus metrics endpoint, and an abstract
//! sink trait that decouples engine instrumentation from the metrics backend.

/// A lightweight HTTP server exposing `/metrics`, `/healthz`, and `/readyz`.
pub mod http;
/// Initialization routine for global structured (`tracing`) logging.
pub mod init;
/// The concrete `prometheus`-backed implementation of [`sinks::MetricsSink`].
pub mod prometheus;
/// The abstract `MetricsSink` trait and its no-op default.
pub mod sinks;
/// A small RAII timer for observing the duration of a scope.
pub mod time;

pub use sinks::metrics;
