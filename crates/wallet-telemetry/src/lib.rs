//! # Wallet Telemetry
//!
//! Structured logging for the wallet bridge contexts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wallet_telemetry::{TelemetryConfig, init_telemetry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::for_context("background");
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // Envelope traffic is now logged
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WB_SERVICE_NAME` | `wallet-bridge` | Service name in log lines |
//! | `WB_CONTEXT` | `background` | Context identifier |
//! | `WB_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `WB_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `WB_JSON_LOGS` | `false` | JSON instead of pretty output |

#![allow(missing_docs)]

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use logging::envelope_span;
pub use tracing_setup::{build_filter, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for this process.
///
/// Returns a guard that should be held for the lifetime of the context.
///
/// # Errors
///
/// `TelemetryError` for an invalid filter or a second initialization.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing_guard = tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        config,
    })
}

/// Guard that keeps telemetry active.
#[derive(Debug)]
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    config: TelemetryConfig,
}

impl TelemetryGuard {
    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

/// Convenience macro for creating a span with context.
///
/// # Example
///
/// ```rust,ignore
/// use wallet_telemetry::context_span;
///
/// let _span = context_span!("connect", context = "background", origin = "https://a.example");
/// ```
#[macro_export]
macro_rules! context_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
