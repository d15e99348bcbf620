//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured filter. Logs go to stderr so that
//! command output on stdout stays clean.

use crate::config::LoggingConfig;
use crate::error::ConsoleError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` if set and valid, else the configured one.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConsoleError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| ConsoleError::Telemetry(format!("bad filter '{}': {}", config.filter, e))),
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConsoleError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| ConsoleError::Telemetry(e.to_string()))?;

    tracing::debug!(json = config.json, filter = %config.filter, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_filter_parses() {
        let config = LoggingConfig {
            filter: "chanda_storage=debug,info".to_string(),
            json: true,
        };
        assert!(env_filter(&config).is_ok());
    }
}
