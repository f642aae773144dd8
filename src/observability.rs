// src/observability.rs
//! Logging and metrics setup
//!
//! The library only emits through `tracing` and `metrics`; installing a
//! subscriber or a recorder is left to the host application.

use crate::utils::config::ProxyConfig;
use metrics::{describe_counter, describe_histogram, Unit};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Calls dispatched, labelled by contract, method and path
pub const CALLS_TOTAL: &str = "dynproxy_calls_total";

/// Interceptor failures, labelled by interceptor
pub const INTERCEPTOR_FAILURES_TOTAL: &str = "dynproxy_interceptor_failures_total";

/// Duration of real-method calls
pub const CALL_DURATION_SECONDS: &str = "dynproxy_call_duration_seconds";

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` wins over `config.log_filter`. Fails if a global subscriber
/// is already set.
pub fn init_tracing(config: &ProxyConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;

    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()?;
    }

    Ok(())
}

/// Register descriptions for the metrics this crate emits
pub fn describe_metrics() {
    describe_counter!(CALLS_TOTAL, "Proxied calls dispatched");
    describe_counter!(
        INTERCEPTOR_FAILURES_TOTAL,
        "Calls where the interceptor itself failed"
    );
    describe_histogram!(
        CALL_DURATION_SECONDS,
        Unit::Seconds,
        "Time spent in the real method"
    );
}
