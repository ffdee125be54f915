//! # Client Error Types
//!
//! Everything that can go wrong between the terminal and the Sales API.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  Server {status, msg}   │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Rejected (success:false│ │
//! │  │                 │  │                 │  │  Decode                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  None of these are retried: one attempt per operator action.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for Sales API calls.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// HTTP client could not be built from the given settings.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Base URL or derived endpoint is not a valid URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Connection refused, DNS failure, reset mid-response.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// Non-2xx response. `message` is the backend's `error` field verbatim,
    /// or the status line when the body carries none.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 2xx response with `success: false`.
    #[error("Sale rejected: {0}")]
    Rejected(String),

    /// Response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidConfig(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// The backend was never reached (or never answered).
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout)
    }

    /// The backend answered and refused.
    pub fn is_server(&self) -> bool {
        matches!(
            self,
            ClientError::Server { .. } | ClientError::Rejected(_) | ClientError::Decode(_)
        )
    }

    /// HTTP status when the backend answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
