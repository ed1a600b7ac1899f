//! Telemetry configuration.
//!
//! Read from the `[telemetry]` section of the node config; environment
//! variables override it.

use std::env;

use serde::{Deserialize, Serialize};

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error), or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,

    /// Write logs to stdout at all
    pub console_output: bool,

    /// Network label (devnet, testnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ulysses-omnichain".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            console_output: true,
            network: "devnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Apply environment overrides.
    ///
    /// - `UO_LOG_LEVEL`: log level
    /// - `UO_JSON_LOGS`: `true`/`1` for JSON output
    /// - `UO_NETWORK`: network label
    pub fn with_env(mut self) -> Self {
        if let Ok(level) = env::var("UO_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(json) = env::var("UO_JSON_LOGS") {
            self.json_logs = json.eq_ignore_ascii_case("true") || json == "1";
        }
        if let Ok(network) = env::var("UO_NETWORK") {
            self.network = network;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "ulysses-omnichain");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TelemetryConfig = toml::from_str("json_logs = true").unwrap();
        assert!(config.json_logs);
        assert_eq!(config.network, "devnet");
    }
}
