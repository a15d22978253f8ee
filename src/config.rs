//! Engine configuration
//!
//! Settings are plain values with builder setters. They can also be read from
//! `QUARRY_*` environment variables.

use crate::error::{Error, Result};

/// Default number of extra decimal places produced by division and AVG
pub const DEFAULT_SCALE_INCREMENT: u32 = 4;

/// Largest scale increment; decimals carry at most 28 fractional digits
pub const MAX_SCALE_INCREMENT: u32 = 28;

/// Environment variable toggling the hash join fast path
pub const ENV_HASH_JOIN: &str = "QUARRY_HASH_JOIN";

/// Environment variable overriding the division scale increment
pub const ENV_DIV_PRECISION: &str = "QUARRY_DIV_PRECISION";

/// Query engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Use a hash index over the build side for equality joins
    pub hash_join: bool,
    /// Extra scale added to the operand scale for `/` and AVG results
    pub avg_scale_increment: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_join: true,
            avg_scale_increment: DEFAULT_SCALE_INCREMENT,
        }
    }
}

impl EngineConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the hash join fast path
    pub fn hash_join(mut self, enabled: bool) -> Self {
        self.hash_join = enabled;
        self
    }

    /// Set the scale increment for division and AVG
    pub fn avg_scale_increment(mut self, increment: u32) -> Result<Self> {
        self.avg_scale_increment = check_scale_increment("avg_scale_increment", increment)?;
        Ok(self)
    }

    /// Build a config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from `(key, value)` pairs, ignoring unrelated keys
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                ENV_HASH_JOIN => {
                    config.hash_join = parse_flag(value).ok_or_else(|| Error::Config {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                }
                ENV_DIV_PRECISION => {
                    let increment = value.parse().map_err(|_| Error::Config {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                    config.avg_scale_increment = check_scale_increment(key, increment)?;
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

fn check_scale_increment(key: &str, increment: u32) -> Result<u32> {
    if increment > MAX_SCALE_INCREMENT {
        return Err(Error::Config {
            key: key.to_string(),
            value: increment.to_string(),
        });
    }
    Ok(increment)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new();
        assert!(config.hash_join);
        assert_eq!(config.avg_scale_increment, 4);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .hash_join(false)
            .avg_scale_increment(2)
            .unwrap();
        assert!(!config.hash_join);
        assert_eq!(config.avg_scale_increment, 2);
    }

    #[test]
    fn test_from_vars() {
        let config = EngineConfig::from_vars([
            ("QUARRY_HASH_JOIN", "off"),
            ("QUARRY_DIV_PRECISION", "6"),
            ("HOME", "/root"),
        ])
        .unwrap();
        assert!(!config.hash_join);
        assert_eq!(config.avg_scale_increment, 6);
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let err = EngineConfig::from_vars([("QUARRY_DIV_PRECISION", "lots")]).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = EngineConfig::from_vars([("QUARRY_HASH_JOIN", "maybe")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config error: invalid value 'maybe' for QUARRY_HASH_JOIN"
        );
    }

    #[test]
    fn test_scale_increment_bounds() {
        let config = EngineConfig::from_vars([("QUARRY_DIV_PRECISION", "28")]).unwrap();
        assert_eq!(config.avg_scale_increment, MAX_SCALE_INCREMENT);

        for value in ["29", "4294967295"] {
            let err = EngineConfig::from_vars([("QUARRY_DIV_PRECISION", value)]).unwrap_err();
            assert!(matches!(err, Error::Config { .. }));
        }
        assert!(matches!(
            EngineConfig::new().avg_scale_increment(u32::MAX),
            Err(Error::Config { .. })
        ));
    }
}
