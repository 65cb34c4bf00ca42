// SPDX-License-Identifier: CC0-1.0

//! Logging setup for the command-line tools.
//!
//! Everything goes to stderr so that stdout carries only command output.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{LoggingError, LoggingResult};

/// Handle returned by [`init_logging`]; keep it alive until exit.
#[derive(Debug)]
pub struct LoggingGuard {
    _private: (),
}

/// Configuration for logging output.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Log level filter. If None, `RUST_LOG` is consulted, then INFO.
    pub level: Option<LevelFilter>,
    /// Include module targets in each line.
    pub with_target: bool,
}

/// Parses a `--log-level` value.
pub fn parse_level(s: &str) -> LoggingResult<LevelFilter> {
    s.parse().map_err(|_| LoggingError::InvalidLevel(s.to_string()))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> LoggingResult<LoggingGuard> {
    let env_filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string())),
    };

    let console_layer = fmt::layer()
        .with_target(config.with_target)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;

    Ok(LoggingGuard {
        _private: (),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::WARN);
        assert!(matches!(parse_level("loud"), Err(LoggingError::InvalidLevel(_))));
    }
}
