//! # Pricing Engine
//!
//! Derives every figure the totals panel, the checkout request and the
//! receipt show from a cart snapshot.
//!
//! ## VAT-Inclusive Arithmetic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shelf prices already include 16% VAT. Tax is backed out, not added.   │
//! │                                                                         │
//! │    total_amount    = Σ quantity × current_unit_price                    │
//! │    total_original  = Σ quantity × original_unit_price                   │
//! │    total_discount  = total_original − total_amount      (signed)        │
//! │    subtotal        = total_amount ÷ 1.16                                │
//! │    vat_amount      = total_amount − subtotal                            │
//! │                                                                         │
//! │  Example: 2 × 1,000 at 800 each                                         │
//! │    total 1,600 │ subtotal 1,379.31 │ VAT 220.69 │ discount 400          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here mutates the cart, and nothing is rounded until
//! [`PricingSummary::rounded`] is called for presentation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine};
use crate::money::Money;
use crate::types::PartId;

/// VAT rate in percent, fixed by law and not configurable.
pub const VAT_RATE_PERCENT: u32 = 16;

/// `1 + VAT`: dividing a tax-inclusive total by this yields the net amount.
pub fn vat_divisor() -> Decimal {
    Decimal::new(116, 2)
}

// =============================================================================
// Summary Types
// =============================================================================

/// Per-line figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LinePricing {
    pub part_id: PartId,
    pub quantity: i64,
    pub unit_price: Money,
    pub original_unit_price: Money,
    pub line_total: Money,
    /// Never negative.
    pub discount: Money,
}

impl From<&CartLine> for LinePricing {
    fn from(line: &CartLine) -> Self {
        LinePricing {
            part_id: line.part_id,
            quantity: line.quantity,
            unit_price: line.current_unit_price,
            original_unit_price: line.original_unit_price,
            line_total: line.line_total(),
            discount: line.discount(),
        }
    }
}

/// Cart totals.
///
/// `total_discount` is signed (raising prices makes it negative);
/// `display_discount` is what the operator sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSummary {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_original: Money,
    pub total_amount: Money,
    pub total_discount: Money,
    pub display_discount: Money,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub lines: Vec<LinePricing>,
}

impl PricingSummary {
    /// Copy with every amount rounded to 2 dp for display.
    pub fn rounded(&self) -> Self {
        PricingSummary {
            item_count: self.item_count,
            total_quantity: self.total_quantity,
            total_original: self.total_original.rounded(),
            total_amount: self.total_amount.rounded(),
            total_discount: self.total_discount.rounded(),
            display_discount: self.display_discount.rounded(),
            subtotal: self.subtotal.rounded(),
            vat_amount: self.vat_amount.rounded(),
            lines: self
                .lines
                .iter()
                .map(|line| LinePricing {
                    unit_price: line.unit_price.rounded(),
                    original_unit_price: line.original_unit_price.rounded(),
                    line_total: line.line_total.rounded(),
                    discount: line.discount.rounded(),
                    ..line.clone()
                })
                .collect(),
        }
    }

    pub fn has_discount(&self) -> bool {
        self.display_discount.is_positive()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless calculator over cart snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        PricingEngine
    }

    /// Computes the full summary for `cart`. Deterministic and pure.
    pub fn summarize(&self, cart: &Cart) -> PricingSummary {
        let lines: Vec<LinePricing> = cart.lines().iter().map(LinePricing::from).collect();

        let total_amount: Money = cart.lines().iter().map(CartLine::line_total).sum();
        let total_original: Money = cart.lines().iter().map(CartLine::original_total).sum();
        let total_discount = total_original - total_amount;
        let (subtotal, vat_amount) = split_vat(total_amount);

        PricingSummary {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_original,
            total_amount,
            total_discount,
            display_discount: total_discount.clamp_non_negative(),
            subtotal,
            vat_amount,
            lines,
        }
    }
}

/// Splits a VAT-inclusive total into `(subtotal, vat)` at full precision.
///
/// ```rust
/// use jokama_core::money::Money;
/// use jokama_core::pricing::split_vat;
///
/// let (subtotal, vat) = split_vat(Money::from_major(2000));
/// assert_eq!(subtotal.display_fixed(), "1,724.14");
/// assert_eq!(vat.display_fixed(), "275.86");
/// assert_eq!(subtotal + vat, Money::from_major(2000));
/// ```
pub fn split_vat(total_amount: Money) -> (Money, Money) {
    let subtotal = total_amount.divide_by(vat_divisor());
    (subtotal, total_amount - subtotal)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Part;
    use std::str::FromStr;

    fn part(id: i64, price: &str, stock: i64) -> Part {
        Part {
            id: PartId(id),
            part_name: format!("Part {}", id),
            oem_number: String::new(),
            sale_price: Money::from_decimal(Decimal::from_str(price).unwrap()),
            stock_quantity: stock,
            buying_price: None,
            category: None,
        }
    }

    fn cart_with(parts: &[(&Part, usize)]) -> Cart {
        let mut cart = Cart::new();
        for (p, times) in parts {
            for _ in 0..*times {
                cart.add_line(p).unwrap();
            }
        }
        cart
    }

    fn cents(money: Money) -> Decimal {
        money.rounded().amount()
    }

    #[test]
    fn test_two_units_at_catalog_price() {
        let p = part(1, "1000", 10);
        let summary = PricingEngine::new().summarize(&cart_with(&[(&p, 2)]));

        assert_eq!(summary.total_amount, Money::from_major(2000));
        assert_eq!(cents(summary.subtotal), Decimal::from_str("1724.14").unwrap());
        assert_eq!(cents(summary.vat_amount), Decimal::from_str("275.86").unwrap());
        assert_eq!(summary.display_discount, Money::zero());
        assert!(!summary.has_discount());
    }

    #[test]
    fn test_price_override_discount() {
        let p = part(1, "1000", 10);
        let mut cart = cart_with(&[(&p, 2)]);
        cart.set_line_price(PartId(1), "800").unwrap();

        let summary = PricingEngine::new().summarize(&cart).rounded();

        assert_eq!(summary.total_amount, Money::from_major(1600));
        assert_eq!(summary.display_discount, Money::from_major(400));
        assert_eq!(summary.subtotal.amount(), Decimal::from_str("1379.31").unwrap());
        assert_eq!(summary.vat_amount.amount(), Decimal::from_str("220.69").unwrap());
        assert_eq!(summary.lines[0].discount, Money::from_major(400));
    }

    #[test]
    fn test_raised_price_hides_discount() {
        let p = part(1, "1000", 10);
        let mut cart = cart_with(&[(&p, 1)]);
        cart.set_line_price(PartId(1), "1250").unwrap();

        let summary = PricingEngine::new().summarize(&cart);
        assert_eq!(summary.total_discount, Money::from_major(-250));
        assert_eq!(summary.display_discount, Money::zero());
    }

    #[test]
    fn test_subtotal_plus_vat_matches_total() {
        let a = part(1, "333.33", 10);
        let b = part(2, "79.99", 10);
        let c = part(3, "0.01", 10);
        let summary = PricingEngine::new().summarize(&cart_with(&[(&a, 3), (&b, 7), (&c, 1)]));

        assert_eq!(summary.subtotal + summary.vat_amount, summary.total_amount);

        let rounded = summary.rounded();
        let drift = (rounded.subtotal + rounded.vat_amount - rounded.total_amount)
            .amount()
            .abs();
        assert!(drift <= Decimal::new(1, 2));

        let expected_vat = summary.total_amount - summary.total_amount.divide_by(vat_divisor());
        assert_eq!(summary.vat_amount, expected_vat);
    }

    #[test]
    fn test_extreme_catalog_price_saturates() {
        let p = part(1, "79228162514264337593543950335", 10);
        let summary = PricingEngine::new().summarize(&cart_with(&[(&p, 2)]));

        assert_eq!(summary.total_amount, Money::from_decimal(Decimal::MAX));
        assert_eq!(summary.total_discount, Money::zero());
        assert!(summary.vat_amount > Money::zero());
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let summary = PricingEngine::new().summarize(&Cart::new());
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.total_amount, Money::zero());
        assert_eq!(summary.subtotal, Money::zero());
        assert_eq!(summary.vat_amount, Money::zero());
    }

    #[test]
    fn test_summary_does_not_mutate_cart() {
        let p = part(1, "1000", 10);
        let cart = cart_with(&[(&p, 2)]);
        let before = cart.clone();

        let engine = PricingEngine::new();
        let first = engine.summarize(&cart);
        let second = engine.summarize(&cart);

        assert_eq!(first, second);
        assert_eq!(cart, before);
        assert_eq!(first.item_count, 1);
        assert_eq!(first.total_quantity, 2);
    }
}
