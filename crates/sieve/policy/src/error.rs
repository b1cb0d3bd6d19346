//! Configuration errors. Every variant is fatal at load time.

use thiserror::Error;

/// Configuration load or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// TOML, YAML or JSON syntax or schema error.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// File extension is not a supported format.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A threshold, weight or budget invariant is violated.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}
