//! Background service configuration.

use shared_bus::{config::env_millis, BusConfig, ConfigError};
use std::time::Duration;

/// Default time the popup gets to start listening.
pub const DEFAULT_POPUP_LAUNCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundConfig {
    /// Bus settings of the background node
    pub bus: BusConfig,
    /// How long to wait for a launched popup to listen
    pub popup_launch_timeout: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            popup_launch_timeout: DEFAULT_POPUP_LAUNCH_TIMEOUT,
        }
    }
}

impl BackgroundConfig {
    /// Load from environment variables.
    ///
    /// Reads the `BusConfig` variables plus `WB_POPUP_LAUNCH_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bus: BusConfig::from_env(),
            popup_launch_timeout: env_millis("WB_POPUP_LAUNCH_TIMEOUT_MS")
                .unwrap_or(DEFAULT_POPUP_LAUNCH_TIMEOUT),
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidTimeout` for a zero launch timeout, or any bus
    /// configuration error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.popup_launch_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "popup_launch_timeout must be > 0".to_string(),
            ));
        }
        self.bus.validate()
    }
}
