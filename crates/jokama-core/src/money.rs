//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  VAT-inclusive prices make it worse:                                    │
//! │    subtotal = 2000 / 1.16 = 1724.137931...                              │
//! │    Rounding too early drifts subtotal + VAT away from the total.       │
//! │                                                                         │
//! │  OUR SOLUTION: Exact decimals, rounded only for presentation            │
//! │    Full precision through every sum and division                        │
//! │    round to 2 dp only when a human (or a receipt) reads it              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use jokama_core::money::Money;
//!
//! let price = Money::from_major(1000);
//! let line_total = price.multiply_quantity(2);
//! assert_eq!(line_total.display_grouped(), "2,000");
//! assert_eq!(line_total.to_string(), "KES 2,000.00");
//! ```

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Currency code printed in front of every displayed amount.
pub const CURRENCY_CODE: &str = "KES";

/// Number of decimal places shown to operators and printed on receipts.
pub const DISPLAY_DECIMALS: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in Kenyan shillings, kept at full decimal precision.
///
/// ## Where Money is Used
/// ```text
/// Part.sale_price ──► CartLine.original_unit_price (frozen)
///                 └─► CartLine.current_unit_price (operator override)
///                              │
///                              ▼
///          PricingEngine: total ──► subtotal (÷ 1.16) ──► VAT
///                              │
///                              ▼
///          CheckoutRequest ──► Sales API ──► Receipt
/// ```
///
/// Serializes as a JSON string (`"1724.137931..."`) and deserializes from
/// either a string or a number, which is what the backend's numeric columns
/// produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a whole-shilling amount.
    ///
    /// ```rust
    /// use jokama_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(1000).display_fixed(), "1,000.00");
    /// ```
    #[inline]
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Clamps negative values to zero.
    ///
    /// Used wherever a discount is shown to the operator: raising a price
    /// above the catalog value yields a negative raw discount, which is
    /// never displayed.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use jokama_core::money::Money;
    ///
    /// let unit_price = Money::from_major(800);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_major(2400));
    /// ```
    ///
    /// Saturates at the decimal range instead of overflowing.
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(Decimal::from(qty)))
    }

    /// Divides by a decimal factor at full precision.
    ///
    /// Division by zero yields zero; the only divisor in use is the fixed
    /// VAT factor.
    pub fn divide_by(&self, divisor: Decimal) -> Self {
        Money(self.0.checked_div(divisor).unwrap_or(Decimal::ZERO))
    }

    /// Rounds to display precision (2 dp, half away from zero).
    ///
    /// ```rust
    /// use jokama_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let subtotal = Money::from_major(2000).divide_by(Decimal::new(116, 2));
    /// assert_eq!(subtotal.rounded().amount().to_string(), "1724.14");
    /// ```
    pub fn rounded(&self) -> Self {
        let mut value = self
            .0
            .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(DISPLAY_DECIMALS);
        Money(value)
    }

    /// Parses an operator-typed price leniently.
    ///
    /// Mirrors what a price input box accepts: leading whitespace is ignored,
    /// the longest numeric prefix is used (`"850abc"` → 850), anything
    /// unparseable becomes zero, and negative input is clamped to zero.
    /// A number with more digits than a decimal holds saturates at
    /// `Decimal::MAX`.
    ///
    /// ```rust
    /// use jokama_core::money::Money;
    ///
    /// assert_eq!(Money::parse_lenient("800"), Money::from_major(800));
    /// assert_eq!(Money::parse_lenient("abc"), Money::zero());
    /// assert_eq!(Money::parse_lenient("-5"), Money::zero());
    /// ```
    pub fn parse_lenient(raw: &str) -> Self {
        let prefix = numeric_prefix(raw.trim());
        match Decimal::from_str(prefix) {
            Ok(value) => Money(value).clamp_non_negative(),
            Err(_) if !prefix.starts_with('-') && prefix.bytes().any(|b| b.is_ascii_digit()) => {
                Money(Decimal::MAX)
            }
            Err(_) => Money::zero(),
        }
    }

    /// Formats with thousands separators and at most two decimals,
    /// trailing zeros trimmed (`1000` → `1,000`, `1379.3103` → `1,379.31`).
    pub fn display_grouped(&self) -> String {
        let rounded = self.rounded();
        format_grouped(rounded.0.normalize(), rounded.is_negative())
    }

    /// Formats with thousands separators and exactly two decimals
    /// (`1724.1379` → `1,724.14`).
    pub fn display_fixed(&self) -> String {
        let rounded = self.rounded();
        format_grouped(rounded.0, rounded.is_negative())
    }
}

/// Returns the leading `[+-]digits[.digits]` slice of `raw`.
fn numeric_prefix(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    raw.get(..end).unwrap_or_default().trim_end_matches('.')
}

fn format_grouped(value: Decimal, negative: bool) -> String {
    let digits = value.abs().to_string();
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(digits.len() + whole.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount the way the cart panel and receipt totals do:
/// `KES 1,724.14`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", CURRENCY_CODE, self.display_fixed())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

/// Saturating, like every operator on `Money`.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
