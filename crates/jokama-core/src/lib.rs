//! # jokama-core: Pure Business Logic for Jokama POS
//!
//! Everything the terminal needs to reason about an order, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Jokama POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Terminal front-end                           │   │
//! │  │    Catalog tiles ──► Cart panel ──► Checkout ──► Receipt        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            jokama-terminal (cart store, print guard)            │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────┐   ┌───────▼──────────────────┐   │
//! │  │   ★ jokama-core (THIS CRATE) ★  │   │     jokama-client        │   │
//! │  │                                 │   │  Sales API over HTTP     │   │
//! │  │  money  types  cart  pricing    │   └──────────────────────────┘   │
//! │  │  receipt  validation            │                                   │
//! │  │                                 │                                   │
//! │  │  NO I/O • NO NETWORK • PURE     │                                   │
//! │  └─────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Decimal money, rounded only for display
//! - [`types`] - Parts, sales, payment methods
//! - [`cart`] - Cart lines with frozen prices and stock snapshots
//! - [`pricing`] - VAT-inclusive totals and discounts
//! - [`receipt`] - Printable tax invoice (HTML and plain text)
//! - [`validation`] - Boundary input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use jokama_core::{Cart, Money, Part, PartId, PricingEngine};
//!
//! let part = Part {
//!     id: PartId(1),
//!     part_name: "Oil Filter".to_string(),
//!     oem_number: "90915-YZZE1".to_string(),
//!     sale_price: Money::from_major(1000),
//!     stock_quantity: 5,
//!     buying_price: None,
//!     category: None,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_line(&part).unwrap();
//! cart.add_line(&part).unwrap();
//! cart.set_line_price(PartId(1), "800").unwrap();
//!
//! let summary = PricingEngine::new().summarize(&cart).rounded();
//! assert_eq!(summary.total_amount.display_grouped(), "1,600");
//! assert_eq!(summary.subtotal.display_fixed(), "1,379.31");
//! assert_eq!(summary.vat_amount.display_fixed(), "220.69");
//! assert_eq!(summary.display_discount.display_grouped(), "400");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, MAX_UNIT_PRICE};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{LinePricing, PricingEngine, PricingSummary};
pub use receipt::{ReceiptDocument, RenderedReceipt, ShopIdentity};
pub use types::*;
