//! `tracing` subscriber setup.
//!
//! Installs a registry with an `EnvFilter` and a pretty or JSON `fmt` layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Guard returned once the global subscriber is installed.
#[derive(Debug)]
pub struct TracingGuard {
    service: String,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service, "Shutting down telemetry");
    }
}

/// Build the filter: `RUST_LOG` wins, then the configured level.
///
/// # Errors
///
/// `TelemetryError::Config` for an unparsable directive.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Install the global subscriber.
///
/// # Errors
///
/// `TelemetryError::AlreadyInitialized` if a global subscriber exists.
pub fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let env_filter = build_filter(config)?;

    if config.json_logs {
        // JSON output for log shipping
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        if config.console_output {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init()
                .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .try_init()
                .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        }
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        if config.console_output {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .try_init()
                .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
        }
    }

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TracingGuard {
        service: config.full_service_name(),
    })
}
