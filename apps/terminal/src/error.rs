//! # Terminal Error Type
//!
//! What an operator action can fail with, and the `{code, message}` payload a
//! front-end receives.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Jokama POS                             │
//! │                                                                         │
//! │  Front-end                   Terminal                                   │
//! │  ─────────                   ────────                                   │
//! │                                                                         │
//! │  terminal.add_to_cart(7)                                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, TerminalError>                                        │  │
//! │  │         │                                                        │  │
//! │  │  CoreError::StockExceeded ──────────┐                            │  │
//! │  │  ClientError (checkout) ────────────┼──► TerminalError           │  │
//! │  │  Config / guard failures ───────────┘         │                  │  │
//! │  │                                               ▼                  │  │
//! │  │                                  ErrorPayload { code, message }  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "STOCK_EXCEEDED", "message": "Only 3 units available!" }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is terminal for the action that raised it. Cart and catalog
//! keep their last valid state.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use jokama_client::ClientError;
use jokama_core::{CoreError, PartId, ValidationError};

use crate::print::GuardError;

/// Result type alias for terminal operations.
pub type TerminalResult<T> = Result<T, TerminalError>;

#[derive(Debug, Error)]
pub enum TerminalError {
    /// Cart, pricing or validation rule violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The sale was not persisted. The cart is untouched.
    #[error("Checkout failed: {0}")]
    CheckoutFailed(#[source] ClientError),

    /// The parts catalog could not be loaded.
    #[error("Catalog refresh failed: {0}")]
    Catalog(#[source] ClientError),

    /// The part is not in the loaded catalog.
    #[error("Part {0} not found")]
    PartNotFound(PartId),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A receipt job could not be opened.
    #[error(transparent)]
    Guard(#[from] GuardError),
}

impl From<ValidationError> for TerminalError {
    fn from(err: ValidationError) -> Self {
        TerminalError::Core(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for TerminalError {
    fn from(err: toml::de::Error) -> Self {
        TerminalError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for TerminalError {
    fn from(err: toml::ser::Error) -> Self {
        TerminalError::ConfigSaveFailed(err.to_string())
    }
}

impl TerminalError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TerminalError::ConfigLoadFailed(_)
                | TerminalError::ConfigSaveFailed(_)
                | TerminalError::InvalidConfig(_)
        )
    }
}

// =============================================================================
// Front-end Payload
// =============================================================================

/// Error codes for front-end handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    StockExceeded,
    EmptyCart,
    /// Backend unreachable or timed out.
    NetworkError,
    /// Backend answered with something unusable.
    ServerError,
    /// Backend refused the sale.
    CheckoutFailed,
    NotFound,
    Internal,
}

/// Serialized error shown by the front-end.
///
/// ```json
/// { "code": "CHECKOUT_FAILED", "message": "Checkout Failed: Insufficient stock" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorPayload {
            code,
            message: message.into(),
        }
    }
}

impl From<&TerminalError> for ErrorPayload {
    fn from(err: &TerminalError) -> Self {
        match err {
            TerminalError::Core(CoreError::StockExceeded { available, .. }) => ErrorPayload::new(
                ErrorCode::StockExceeded,
                format!("Only {} units available!", available),
            ),
            TerminalError::Core(CoreError::EmptyCart) => {
                ErrorPayload::new(ErrorCode::EmptyCart, "Cart is empty")
            }
            TerminalError::Core(CoreError::Validation(e)) => {
                ErrorPayload::new(ErrorCode::ValidationError, e.to_string())
            }
            TerminalError::Core(CoreError::Render(e)) => {
                error!("Receipt render failed: {}", e);
                ErrorPayload::new(ErrorCode::Internal, "Receipt could not be rendered")
            }
            TerminalError::CheckoutFailed(e) if e.is_network() => ErrorPayload::new(
                ErrorCode::NetworkError,
                "Network Error. Check if server is running.",
            ),
            TerminalError::CheckoutFailed(ClientError::Server { message, .. })
            | TerminalError::CheckoutFailed(ClientError::Rejected(message)) => ErrorPayload::new(
                ErrorCode::CheckoutFailed,
                format!("Checkout Failed: {}", message),
            ),
            TerminalError::CheckoutFailed(e) | TerminalError::Catalog(e) if e.is_network() => {
                ErrorPayload::new(ErrorCode::NetworkError, e.to_string())
            }
            TerminalError::CheckoutFailed(e) | TerminalError::Catalog(e) => {
                ErrorPayload::new(ErrorCode::ServerError, e.to_string())
            }
            TerminalError::PartNotFound(id) => {
                ErrorPayload::new(ErrorCode::NotFound, format!("Part not found: {}", id))
            }
            other => {
                error!("Terminal error: {}", other);
                ErrorPayload::new(ErrorCode::Internal, other.to_string())
            }
        }
    }
}

impl From<TerminalError> for ErrorPayload {
    fn from(err: TerminalError) -> Self {
        ErrorPayload::from(&err)
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_exceeded_payload() {
        let err = TerminalError::Core(CoreError::StockExceeded {
            part_id: PartId(1),
            name: "Brake Pad".into(),
            available: 3,
        });
        let payload = ErrorPayload::from(&err);
        assert_eq!(payload.code, ErrorCode::StockExceeded);
        assert_eq!(payload.message, "Only 3 units available!");
    }

    #[test]
    fn test_checkout_failure_payloads() {
        let refused = TerminalError::CheckoutFailed(ClientError::Server {
            status: 409,
            message: "Insufficient stock".into(),
        });
        let payload = ErrorPayload::from(&refused);
        assert_eq!(payload.code, ErrorCode::CheckoutFailed);
        assert_eq!(payload.message, "Checkout Failed: Insufficient stock");

        let offline = TerminalError::CheckoutFailed(ClientError::Timeout);
        assert_eq!(ErrorPayload::from(&offline).code, ErrorCode::NetworkError);

        let garbled = TerminalError::CheckoutFailed(ClientError::Decode("eof".into()));
        assert_eq!(ErrorPayload::from(&garbled).code, ErrorCode::ServerError);
    }

    #[test]
    fn test_validation_payload() {
        let err: TerminalError = ValidationError::Required {
            field: "payment_method".into(),
        }
        .into();
        let payload = ErrorPayload::from(err);
        assert_eq!(payload.code, ErrorCode::ValidationError);
        assert_eq!(payload.message, "payment_method is required");
    }

    #[test]
    fn test_payload_serialization() {
        let payload = ErrorPayload::new(ErrorCode::EmptyCart, "Cart is empty");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"code":"EMPTY_CART","message":"Cart is empty"}"#);
    }

    #[test]
    fn test_config_errors_are_categorized() {
        assert!(TerminalError::InvalidConfig("x".into()).is_config_error());
        assert!(!TerminalError::PartNotFound(PartId(1)).is_config_error());
    }
}
