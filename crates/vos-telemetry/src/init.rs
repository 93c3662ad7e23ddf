//! Global structured-logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global `tracing` subscriber with JSON-formatted output and
/// an [`EnvFilter`] seeded from `filter` (typically [`vos_types::config::VosConfig::log_filter`]).
///
/// Also bridges the `log` crate (used transitively by some dependencies) into
/// `tracing` via [`tracing_log::LogTracer`]. Safe to call at most once per
/// process; a second call returns an error rather than panicking.
pub fn init_tracing(filter: &str) -> Result<(), anyhow::Error> {
    tracing_log::LogTracer::init()?;

    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_target(true).with_current_span(true));

    subscriber.try_init()?;
    Ok(())
}
