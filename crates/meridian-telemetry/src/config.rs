//! # Telemetry Configuration

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level filter in `tracing` env-filter syntax.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Read configuration from `MI_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("MI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
