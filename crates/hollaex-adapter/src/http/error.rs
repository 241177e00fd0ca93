/*
[INPUT]:  Error sources (HTTP, API, serialization, config, WebSocket)
[OUTPUT]: Structured error types with retry and auth hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the HollaEx adapter
#[derive(Error, Debug)]
pub enum HollaexError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status; body is passed through untouched
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },

    /// Authenticated endpoint called without credentials
    #[error("API key and secret are required for this request")]
    MissingCredentials,

    /// Stream operation attempted while the session is not open
    #[error("WebSocket connection is not open")]
    NotConnected,

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HollaexError {
    /// Check if the error is a transient transport failure
    pub fn is_retryable(&self) -> bool {
        match self {
            HollaexError::Http(err) => err.is_timeout() || err.is_connect(),
            HollaexError::WebSocket(_) => true,
            HollaexError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Check if the server rejected the request's credentials
    pub fn is_auth_error(&self) -> bool {
        match self {
            HollaexError::Api { code, .. } => *code == 401 || *code == 403,
            HollaexError::MissingCredentials => true,
            _ => false,
        }
    }

    /// Create an API error from status code and response body
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        HollaexError::Api {
            code: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Result type alias for HollaEx operations
pub type Result<T> = std::result::Result<T, HollaexError>;
