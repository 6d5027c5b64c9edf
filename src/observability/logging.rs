//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG`, when set, wins over the
//! configured filter; output is JSON lines by default or human-readable text
//! with `format: pretty`.

use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::config::LoggingConfig;
use crate::core::error::{GatewayError, GatewayResult};

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(GatewayError::config(format!("Unknown log format: {}", other))),
        }
    }
}

/// Filter from `RUST_LOG`, falling back to the configured directives
pub fn build_filter(config: &LoggingConfig) -> GatewayResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| GatewayError::config(format!("Invalid log level '{}': {}", config.level, e))),
    }
}

/// Install the global subscriber
///
/// Calling this twice is harmless: the second subscriber is discarded with a warning.
pub fn init_logging(config: &LoggingConfig) -> GatewayResult<()> {
    let format = config.format.parse::<LogFormat>()?;
    let filter = build_filter(config)?;

    let result = match format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return Ok(());
    }

    info!(format = ?format, "Structured logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_invalid_format_is_rejected_before_install() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "yaml".to_string(),
        };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
