//! Logging setup for Quarry
//!
//! The library only emits `tracing` events; binaries call [`LogConfig::init`]
//! to install a subscriber. Output goes to stderr so that query results on
//! stdout stay clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable format
    Pretty,
    /// Compact single-line format (default)
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level filter, e.g. `info` or `quarry=debug`
    pub level: String,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Create config with debug level
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Install the global subscriber. `RUST_LOG` takes precedence over the
    /// configured level.
    pub fn init(self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::Config {
                key: "log level".to_string(),
                value: format!("{} ({})", self.level, e),
            })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = match self.format {
            LogFormat::Pretty => registry
                .with(fmt::layer().with_writer(std::io::stderr).pretty())
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().with_writer(std::io::stderr).compact())
                .try_init(),
        };
        installed.map_err(|e| Error::Internal(format!("logging already initialized: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::debug()
            .with_level("quarry=trace")
            .with_format(LogFormat::Pretty);
        assert_eq!(config.level, "quarry=trace");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
