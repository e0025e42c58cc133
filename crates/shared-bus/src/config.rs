//! Bus configuration from environment variables.

use std::env;
use std::time::Duration;

/// Timeouts and housekeeping for one context node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Timeout applied to requests that do not set their own.
    /// `None` waits for the response indefinitely.
    pub default_request_timeout: Option<Duration>,

    /// Upper bound for requests that wait on a user prompt.
    pub prompt_timeout: Option<Duration>,

    /// How often the node sweeps expired or abandoned pending requests and
    /// fails those whose target stopped listening.
    pub sweep_interval: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_request_timeout: None,
            prompt_timeout: None,
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl BusConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WB_REQUEST_TIMEOUT_MS`: default request timeout (unset or 0: none)
    /// - `WB_PROMPT_TIMEOUT_MS`: prompt timeout (unset or 0: none)
    /// - `WB_SWEEP_INTERVAL_MS`: pending sweep interval (default: 30000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_request_timeout: env_millis("WB_REQUEST_TIMEOUT_MS")
                .filter(|d| !d.is_zero()),
            prompt_timeout: env_millis("WB_PROMPT_TIMEOUT_MS").filter(|d| !d.is_zero()),
            sweep_interval: env_millis("WB_SWEEP_INTERVAL_MS").unwrap_or(defaults.sweep_interval),
        }
    }

    /// Set the default request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.default_request_timeout = Some(timeout);
        self
    }

    /// Set the prompt timeout.
    #[must_use]
    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = Some(timeout);
        self
    }

    /// Set how often pending requests are swept.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidTimeout` for zero timeouts or sweep interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval cannot be 0".into(),
            ));
        }

        if self.default_request_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "default_request_timeout cannot be 0".into(),
            ));
        }

        if self.prompt_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "prompt_timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Read a millisecond duration; unparsable values count as unset.
pub fn env_millis(var: &str) -> Option<Duration> {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
