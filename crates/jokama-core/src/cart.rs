//! # Cart
//!
//! The operator's order under construction: one line per distinct part.
//!
//! ## Line Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Line Lifecycle                               │
//! │                                                                         │
//! │  Click tile (new part)                                                  │
//! │      │   original = current = part.sale_price   (captured once)         │
//! │      │   stock_snapshot = part.stock_quantity   (captured once)         │
//! │      ▼   quantity = 1                                                   │
//! │  ┌────────────┐  click tile again   ┌────────────────────────────┐     │
//! │  │  CartLine  │ ──────────────────► │ quantity < stock_snapshot? │     │
//! │  └─────┬──────┘                     │  yes → quantity += 1       │     │
//! │        │                            │  no  → StockExceeded       │     │
//! │        │ type price                 └────────────────────────────┘     │
//! │        ▼                                                                │
//! │  current_unit_price = parse_lenient(raw)   (0 ..= MAX_UNIT_PRICE)      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  remove_line(id) or clear() after a successful checkout                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Removing a line and adding the part again starts a fresh line, so the
//! catalog price and stock are re-captured at that moment.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Part, PartId};

/// Highest unit price an operator may type, in whole shillings.
///
/// Keeps `quantity × price` and the cart totals well inside the decimal
/// range for any realistic stock level.
pub const MAX_UNIT_PRICE: i64 = 100_000_000;

// =============================================================================
// Cart Line
// =============================================================================

/// One distinct part in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Unique key within the cart.
    pub part_id: PartId,

    pub name: String,

    /// OEM number at time of adding.
    pub oem_code: String,

    /// Always >= 1.
    pub quantity: i64,

    /// Catalog price when the line was created (frozen).
    pub original_unit_price: Money,

    /// Price the line will be sold at. Starts equal to the original.
    pub current_unit_price: Money,

    /// Stock on hand when the line was created (frozen). Bounds `quantity`.
    pub stock_snapshot: i64,
}

impl CartLine {
    /// Creates a one-unit line from the catalog entry as it reads right now.
    pub fn from_part(part: &Part) -> Self {
        CartLine {
            part_id: part.id,
            name: part.part_name.clone(),
            oem_code: part.oem_number.clone(),
            quantity: 1,
            original_unit_price: part.sale_price,
            current_unit_price: part.sale_price,
            stock_snapshot: part.stock_quantity,
        }
    }

    /// `quantity × current_unit_price`
    pub fn line_total(&self) -> Money {
        self.current_unit_price.multiply_quantity(self.quantity)
    }

    /// `quantity × original_unit_price`
    pub fn original_total(&self) -> Money {
        self.original_unit_price.multiply_quantity(self.quantity)
    }

    /// Signed discount: negative when the price was raised above catalog.
    pub fn raw_discount(&self) -> Money {
        (self.original_unit_price - self.current_unit_price).multiply_quantity(self.quantity)
    }

    /// Discount shown to the operator; never negative.
    pub fn discount(&self) -> Money {
        self.raw_discount().clamp_non_negative()
    }

    /// Whether the operator changed the price away from the catalog value.
    pub fn is_price_overridden(&self) -> bool {
        self.current_unit_price != self.original_unit_price
    }

    pub fn can_add_unit(&self) -> bool {
        self.quantity < self.stock_snapshot
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Ordered collection of [`CartLine`]s keyed by part id.
///
/// ## Invariants
/// - At most one line per `part_id`
/// - `1 <= quantity <= stock_snapshot` for every line
/// - Insertion order is display order only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds one unit of `part`.
    ///
    /// ## Behavior
    /// - Part already in cart: quantity + 1, bounded by the line's stock
    ///   snapshot (not by `part.stock_quantity`, which may have changed)
    /// - Part not in cart: new line capturing price and stock now
    ///
    /// ## Errors
    /// `StockExceeded` when the bound is hit or the part has no stock. The
    /// cart is unchanged.
    pub fn add_line(&mut self, part: &Part) -> CoreResult<&CartLine> {
        if let Some(index) = self.position(part.id) {
            let line = &mut self.lines[index];
            if !line.can_add_unit() {
                return Err(CoreError::StockExceeded {
                    part_id: line.part_id,
                    name: line.name.clone(),
                    available: line.stock_snapshot,
                });
            }
            line.quantity += 1;
            return Ok(&self.lines[index]);
        }

        if !part.is_sellable() {
            return Err(CoreError::StockExceeded {
                part_id: part.id,
                name: part.part_name.clone(),
                available: 0,
            });
        }

        self.lines.push(CartLine::from_part(part));
        let last = self.lines.len() - 1;
        Ok(&self.lines[last])
    }

    /// Removes the line for `part_id`. Absent ids are ignored.
    ///
    /// Returns whether a line was removed.
    pub fn remove_line(&mut self, part_id: PartId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.part_id != part_id);
        self.lines.len() != before
    }

    /// Overrides the selling price of a line from raw operator input.
    ///
    /// Input is parsed with [`Money::parse_lenient`]: garbage becomes zero
    /// and negatives clamp to zero. There is no floor; the ceiling is
    /// [`MAX_UNIT_PRICE`]. Unknown ids are a no-op and return `Ok(None)`.
    ///
    /// ## Errors
    /// `ValidationError::ExceedsMaximum` above the ceiling. The line keeps
    /// its previous price.
    pub fn set_line_price(&mut self, part_id: PartId, raw: &str) -> CoreResult<Option<Money>> {
        let Some(line) = self.lines.iter_mut().find(|line| line.part_id == part_id) else {
            return Ok(None);
        };

        let price = Money::parse_lenient(raw);
        let ceiling = Money::from_major(MAX_UNIT_PRICE);
        if price > ceiling {
            return Err(ValidationError::ExceedsMaximum {
                field: "price".to_string(),
                max: ceiling.display_grouped(),
            }
            .into());
        }

        line.current_unit_price = price;
        Ok(Some(price))
    }

    /// Empties the cart. Only called after a successful checkout.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, part_id: PartId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.part_id == part_id)
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn position(&self, part_id: PartId) -> Option<usize> {
        self.lines.iter().position(|line| line.part_id == part_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
