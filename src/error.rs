//! Error types for the Opticon client.
//!
//! Failures of individual remote calls are described by
//! [`ApiError`](crate::api::ApiError); this module covers everything around
//! them (configuration, files, client construction).

use thiserror::Error;

/// The main error type for Opticon.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (config files, log directory, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote API errors
    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}
