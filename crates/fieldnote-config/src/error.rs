use std::path::PathBuf;

/// Result alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading, saving or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `api_base_url` is blank
    #[error("API base URL not configured")]
    MissingBaseUrl,

    /// `api_key` is blank
    #[error("API key not configured")]
    MissingApiKey,

    /// `api_base_url` is not an absolute http(s) URL
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },

    /// `upload.poll_interval` is not a duration
    #[error("invalid poll interval '{value}': {reason}")]
    InvalidPollInterval {
        /// Offending value
        value: String,
        /// Parser message
        reason: String,
    },

    /// The config file exists but could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The config file could not be written
    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// TOML parse failure
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization failure
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
