//! SlackPort error types

use thiserror::Error;

/// SlackPort error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A scoped bearer token could not be extracted from an auth record
    #[error("Token resolution error: {0}")]
    TokenResolution(String),

    /// Auth context lookup or webhook signature failure
    #[error("Auth error: {0}")]
    Auth(String),

    /// Slack Web API returned `ok: false`
    #[error("Slack API error: {0}")]
    Platform(String),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for SlackPort operations
pub type Result<T> = std::result::Result<T, Error>;
