//! Core error types for Trawler.
//!
//! `ConfigError` covers the config file lifecycle; `TrawlerError` wraps it
//! together with validation failures of the shared types.

use thiserror::Error;

/// Error type for core operations: configuration and identifier validation.
///
/// Storage and browser failures have their own error types in their crates.
#[derive(Error, Debug)]
pub enum TrawlerError {
    /// Loading or validating the configuration failed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A value failed validation (empty identifier, malformed input)
    #[error("validation error: {0}")]
    Validation(String),

    /// Filesystem failure outside the config loader
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// An explicitly requested config file does not exist
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A loaded value is out of range or empty
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `TrawlerError`.
pub type Result<T> = std::result::Result<T, TrawlerError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrawlerError::Validation("empty identifier".to_string());
        assert_eq!(err.to_string(), "validation error: empty identifier");

        let err = ConfigError::InvalidValue {
            field: "search.queries".to_string(),
            reason: "must not be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for search.queries: must not be empty"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: TrawlerError = config_err.into();
        assert!(matches!(err, TrawlerError::Config(_)));
    }
}
