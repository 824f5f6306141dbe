//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable. Every workspace crate
/// logs at debug; dependencies stay at info.
pub const DEFAULT_FILTER: &str =
    "info,mb_app=debug,mb_core=debug,mb_refresh=debug,mb_universalis=debug,mb_telemetry=debug";

fn env_filter() -> (EnvFilter, bool) {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_FILTER), false),
    }
}

fn is_production() -> bool {
    std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false)
}

/// Install the global subscriber.
///
/// `RUST_ENV=production` selects JSON lines; anything else gets the pretty
/// formatter on stderr, leaving stdout to the console renderer.
/// Fails if a global subscriber is already installed.
pub fn init_logging() -> TelemetryResult<()> {
    let (filter, from_env) = env_filter();
    let production = is_production();

    let installed = if production {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    installed.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    info!(
        json = production,
        filter = if from_env { "RUST_LOG" } else { DEFAULT_FILTER },
        "Logging initialized"
    );
    Ok(())
}
