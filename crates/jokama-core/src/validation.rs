//! # Validation Module
//!
//! Input checks applied at the terminal boundary, before anything touches
//! the cart or the network.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Terminal front-end                                            │
//! │  └── Disabled tiles, numeric price input                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Terminal facade (Rust)                                        │
//! │  └── THIS MODULE: ids, payment method, search terms                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Sales API                                                     │
//! │  └── Stock re-validation, persistence constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Price overrides typed into the cart are *not* validated here; they go
//! through `Money::parse_lenient` and never fail.

use std::str::FromStr;

use crate::error::ValidationError;
use crate::types::{PartId, PaymentMethod, SaleId};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest catalog search term accepted.
pub const MAX_SEARCH_LENGTH: usize = 100;

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a catalog part id.
///
/// ```rust
/// use jokama_core::validation::validate_part_id;
///
/// assert!(validate_part_id(12).is_ok());
/// assert!(validate_part_id(0).is_err());
/// ```
pub fn validate_part_id(id: i64) -> ValidationResult<PartId> {
    positive(id, "part_id").map(PartId)
}

/// Validates a sale id, e.g. one picked from sales history for reprinting.
pub fn validate_sale_id(id: i64) -> ValidationResult<SaleId> {
    positive(id, "sale_id").map(SaleId)
}

fn positive(value: i64, field: &str) -> ValidationResult<i64> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(value)
}

// =============================================================================
// Text
// =============================================================================

/// Parses the payment method chosen at checkout.
///
/// ## Rules
/// - Required
/// - One of `Cash`, `M-Pesa` (case-insensitive, `mpesa` accepted)
pub fn validate_payment_method(raw: &str) -> ValidationResult<PaymentMethod> {
    PaymentMethod::from_str(raw)
}

/// Validates a catalog search term and returns it trimmed.
///
/// An empty term is allowed and matches every part.
pub fn validate_search_term(term: &str) -> ValidationResult<String> {
    let term = term.trim();
    if term.chars().count() > MAX_SEARCH_LENGTH {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_LENGTH,
        });
    }
    Ok(term.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ids() {
        assert_eq!(validate_part_id(7).unwrap(), PartId(7));
        assert_eq!(validate_sale_id(42).unwrap(), SaleId(42));
        assert!(matches!(
            validate_part_id(-1),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_sale_id(0).is_err());
    }

    #[test]
    fn test_validate_payment_method() {
        assert_eq!(validate_payment_method("Cash").unwrap(), PaymentMethod::Cash);
        assert_eq!(validate_payment_method(" MPESA ").unwrap(), PaymentMethod::MPesa);
        assert!(validate_payment_method("card").is_err());
        assert!(validate_payment_method("").is_err());
    }

    #[test]
    fn test_validate_search_term() {
        assert_eq!(validate_search_term("  brake ").unwrap(), "brake");
        assert_eq!(validate_search_term("").unwrap(), "");
        assert!(validate_search_term(&"x".repeat(101)).is_err());
    }
}
