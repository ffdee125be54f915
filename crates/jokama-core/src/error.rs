//! # Error Types
//!
//! Domain-specific error types for jokama-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  jokama-core errors (this file)                                        │
//! │  ├── CoreError        - Cart / pricing / receipt rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  jokama-client errors (separate crate)                                 │
//! │  └── ClientError      - Network / server failures                      │
//! │                                                                         │
//! │  terminal errors (in app)                                              │
//! │  └── TerminalError    - What the operator sees (code + message)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → TerminalError → ErrorPayload      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::PartId;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is terminal for the action that raised it: the cart is left
/// exactly as it was before the call.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Adding one more unit would exceed the stock captured at first add.
    ///
    /// ## User Workflow
    /// ```text
    /// Click part tile (cart already holds 3, snapshot = 3)
    ///      │
    ///      ▼
    /// StockExceeded { name: "Brake Pad", available: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 units available!"
    /// ```
    #[error("Only {available} units of {name} available")]
    StockExceeded {
        part_id: PartId,
        name: String,
        available: i64,
    },

    /// Checkout was requested on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A persisted receipt could not be turned into a document.
    #[error("Receipt cannot be rendered: {0}")]
    Render(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any network call, so a failed validation never reaches the
/// backend.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (non-numeric price, malformed id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Value must be strictly positive (ids, quantities).
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value is above the accepted ceiling.
    #[error("{field} must not exceed {max}")]
    ExceedsMaximum { field: String, max: String },

    /// Text exceeds maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_exceeded_message() {
        let err = CoreError::StockExceeded {
            part_id: PartId(7),
            name: "Brake Pad".to_string(),
            available: 3,
        };
        assert_eq!(err.to_string(), "Only 3 units of Brake Pad available");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "payment_method".to_string(),
        };
        assert_eq!(err.to_string(), "payment_method is required");

        let err = ValidationError::MustBeNonNegative {
            field: "price".to_string(),
        };
        assert_eq!(err.to_string(), "price must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "payment_method".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
