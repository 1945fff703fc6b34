//! Configuration loading errors.

use thiserror::Error;

/// Error loading or parsing a configuration file.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// TOML parse failure
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
