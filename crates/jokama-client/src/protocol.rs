//! # Sales API Protocol
//!
//! Request and response bodies exchanged with the backend.
//!
//! ## Checkout Exchange
//! ```text
//! ┌───────────────┐                                   ┌───────────────┐
//! │   Terminal    │                                   │   Sales API   │
//! └───────┬───────┘                                   └───────┬───────┘
//!         │                                                   │
//!         │  POST /sales/checkout                             │
//!         │  { cart: [ {id, part_name, qty, sale_price,       │
//!         │             original_price, ...} ],               │
//!         │    subtotal: "1379.31", vat_amount: "220.69",     │
//!         │    total_amount: "1600", payment_method: "Cash" } │
//!         │──────────────────────────────────────────────────►│
//!         │                                                   │ re-checks stock,
//!         │                                                   │ persists sale
//!         │  200 { success: true, saleId: 42 }                │
//!         │◄──────────────────────────────────────────────────│
//!         │                                                   │
//!         │  GET /sales/receipt/42                            │
//!         │──────────────────────────────────────────────────►│
//!         │  200 { header: {...}, items: [...] }              │
//!         │◄──────────────────────────────────────────────────│
//! ```
//!
//! `subtotal` and `vat_amount` are sent rounded to 2 dp; `total_amount`
//! keeps full precision. The backend stores what it is given.

use jokama_core::{Cart, CartLine, Money, PartId, PaymentMethod, PricingSummary, SaleId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Checkout Request
// =============================================================================

/// One cart line as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub id: PartId,
    pub part_name: String,
    pub oem_number: String,
    pub qty: i64,
    /// Price actually charged (after any override).
    pub sale_price: Money,
    /// Catalog price when the line was created.
    pub original_price: Money,
    pub stock_snapshot: i64,
}

impl From<&CartLine> for CheckoutLine {
    fn from(line: &CartLine) -> Self {
        CheckoutLine {
            id: line.part_id,
            part_name: line.name.clone(),
            oem_number: line.oem_code.clone(),
            qty: line.quantity,
            sale_price: line.current_unit_price,
            original_price: line.original_unit_price,
            stock_snapshot: line.stock_snapshot,
        }
    }
}

/// Body of `POST /sales/checkout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cart: Vec<CheckoutLine>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// Builds the request from a cart snapshot and its (unrounded) summary.
    pub fn new(cart: &Cart, summary: &PricingSummary, payment_method: PaymentMethod) -> Self {
        CheckoutRequest {
            cart: cart.lines().iter().map(CheckoutLine::from).collect(),
            subtotal: summary.subtotal.rounded(),
            vat_amount: summary.vat_amount.rounded(),
            total_amount: summary.total_amount,
            payment_method,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Body of a checkout response, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    #[serde(rename = "saleId", default, skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<SaleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body the backend sends with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}
