//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output of one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Context the process runs as (page, background, popup)
    pub context: String,

    /// Log level filter (trace, debug, info, warn, error) or full directive
    pub log_level: String,

    /// Whether to enable console output (for development)
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "wallet-bridge".to_string(),
            context: "background".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WB_SERVICE_NAME`: Service name (default: wallet-bridge)
    /// - `WB_CONTEXT`: Context name (default: background)
    /// - `WB_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `WB_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `WB_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("WB_SERVICE_NAME")
                .unwrap_or_else(|_| "wallet-bridge".to_string()),

            context: env::var("WB_CONTEXT").unwrap_or_else(|_| "background".to_string()),

            log_level: env::var("WB_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("WB_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("WB_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Create configuration for a specific context.
    pub fn for_context(context: &str) -> Self {
        let mut config = Self::from_env();
        config.context = context.to_string();
        config
    }

    /// Get the full service name including context.
    pub fn full_service_name(&self) -> String {
        if self.context.is_empty() {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "wallet-bridge");
        assert_eq!(config.log_level, "info");
        assert!(config.console_output);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_for_context() {
        let config = TelemetryConfig::for_context("popup");
        assert_eq!(config.context, "popup");
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "wallet-bridge-background");

        config.context = String::new();
        assert_eq!(config.full_service_name(), "wallet-bridge");
    }
}
