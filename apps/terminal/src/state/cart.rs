//! # Cart State
//!
//! The terminal's shared handle on the in-progress sale.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  Operator Action          Terminal Call           Cart State Change     │
//! │  ───────────────          ─────────────           ─────────────────     │
//! │                                                                         │
//! │  Click Part ─────────────► add_part() ──────────► qty+1 or new line    │
//! │                                                                         │
//! │  Edit Price ─────────────► set_price() ─────────► current price = n    │
//! │                                                                         │
//! │  Click Remove ───────────► remove() ────────────► line deleted         │
//! │                                                                         │
//! │  Checkout Success ───────► clear() ─────────────► lines.clear()        │
//! │                                                                         │
//! │  View Cart ──────────────► view() ──────────────► (read only)          │
//! │                                                                         │
//! │  NOTE: The lock is held only for the synchronous mutation.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use jokama_core::{Cart, CartLine, CoreResult, Money, Part, PartId, PricingEngine, PricingSummary};

/// Lines plus totals, ready for a cart panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Rounded to two decimals.
    pub summary: PricingSummary,
}

/// Session cart shared between the facade and the checkout coordinator.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    cart: Arc<Mutex<Cart>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a function with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock();
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock();
        f(&mut cart)
    }

    /// Copy of the cart at this instant.
    pub fn snapshot(&self) -> Cart {
        self.with_cart(Cart::clone)
    }

    /// Adds one unit of `part`, bounded by the stock seen when the line was
    /// first added.
    pub fn add_part(&self, part: &Part) -> CoreResult<CartLine> {
        let line = self.with_cart_mut(|cart| cart.add_line(part).cloned())?;
        debug!(
            part_id = %line.part_id,
            quantity = line.quantity,
            stock_snapshot = line.stock_snapshot,
            "Added to cart"
        );
        Ok(line)
    }

    /// Returns true if a line was removed.
    pub fn remove(&self, part_id: PartId) -> bool {
        let removed = self.with_cart_mut(|cart| cart.remove_line(part_id));
        debug!(%part_id, removed, "Removed from cart");
        removed
    }

    /// Overrides a line's selling price. `Ok(None)` if the part is not in
    /// the cart.
    pub fn set_price(&self, part_id: PartId, raw: &str) -> CoreResult<Option<Money>> {
        let price = self
            .with_cart_mut(|cart| cart.set_line_price(part_id, raw))
            .map_err(|e| {
                warn!(%part_id, raw, error = %e, "Line price refused");
                e
            })?;
        debug!(%part_id, raw, price = ?price, "Line price set");
        Ok(price)
    }

    pub fn clear(&self) {
        self.with_cart_mut(Cart::clear);
        debug!("Cart cleared");
    }

    pub fn is_empty(&self) -> bool {
        self.with_cart(Cart::is_empty)
    }

    pub fn view(&self) -> CartView {
        self.with_cart(|cart| CartView {
            lines: cart.lines().to_vec(),
            summary: PricingEngine::new().summarize(cart).rounded(),
        })
    }
}
