//! Error types for pricesync-clients

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum Error {
    /// Non-success HTTP response from an external API
    #[error("api error: status {status}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Transport-level HTTP failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credential or token-exchange failure
    #[error("auth error: {0}")]
    Auth(String),

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
