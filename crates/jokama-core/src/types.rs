//! # Domain Types
//!
//! Core domain types shared by the cart, the Sales API client and the
//! receipt renderer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Part       │   │   SaleHeader    │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (PartId)    │   │  id (SaleId)    │   │  part_name      │       │
//! │  │  part_name      │   │  subtotal       │   │  quantity       │       │
//! │  │  oem_number     │   │  vat_amount     │   │  unit_price     │       │
//! │  │  sale_price     │   │  total_amount   │   │  original_price │       │
//! │  │  stock_quantity │   │  payment_method │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PaymentMethod  │   │   SaleStatus    │   │   StockStatus   │       │
//! │  │  Cash           │   │   Completed     │   │   OutOfStock    │       │
//! │  │  M-Pesa         │   │   Voided        │   │   LowStock(n)   │       │
//! │  └─────────────────┘   └─────────────────┘   │   Available(n)  │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names follow the backend's JSON (`part_name`, `oem_number`,
//! `vat_amount`) so the same types serve as wire DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Parts with fewer units than this are flagged as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

// =============================================================================
// Identifiers
// =============================================================================

/// Catalog identifier of a part; also the key of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct PartId(pub i64);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-assigned identifier of a persisted sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct SaleId(pub i64);

impl SaleId {
    /// Invoice number printed on the receipt, e.g. `SAL-42`.
    pub fn invoice_number(&self) -> String {
        format!("SAL-{}", self.0)
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Part (catalog entry)
// =============================================================================

/// A spare part as listed by `GET /parts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Part {
    pub id: PartId,

    /// Display name shown on the tile, in the cart and on the receipt.
    pub part_name: String,

    /// Manufacturer (OEM) part number.
    #[serde(default)]
    pub oem_number: String,

    /// Current catalog selling price.
    pub sale_price: Money,

    /// Units on hand at the time the catalog was fetched.
    pub stock_quantity: i64,

    /// Cost price (inventory screens only).
    #[serde(default)]
    pub buying_price: Option<Money>,

    #[serde(default)]
    pub category: Option<String>,
}

impl Part {
    /// Classifies the stock level for the catalog tile badge.
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_quantity(self.stock_quantity)
    }

    /// A part can be added to the cart only while units remain.
    pub fn is_sellable(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Case-insensitive match on part name or OEM number.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        needle.is_empty()
            || self.part_name.to_lowercase().contains(&needle)
            || self.oem_number.to_lowercase().contains(&needle)
    }
}

// =============================================================================
// Stock Status
// =============================================================================

/// Stock badge shown on a catalog tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", content = "quantity", rename_all = "snake_case")]
pub enum StockStatus {
    /// Zero or negative stock; the tile is disabled.
    OutOfStock,
    /// Fewer than [`LOW_STOCK_THRESHOLD`] units.
    LowStock(i64),
    Available(i64),
}

impl StockStatus {
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity < LOW_STOCK_THRESHOLD {
            StockStatus::LowStock(quantity)
        } else {
            StockStatus::Available(quantity)
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::OutOfStock => write!(f, "Out of Stock"),
            StockStatus::LowStock(n) => write!(f, "Low Stock: {}", n),
            StockStatus::Available(n) => write!(f, "{} Available", n),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Wire values match the backend (`"Cash"`,
/// `"M-Pesa"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Cash,
    #[serde(rename = "M-Pesa")]
    MPesa,
}

impl PaymentMethod {
    /// Wire and display label.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::MPesa => "M-Pesa",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(ValidationError::Required {
                field: "payment_method".to_string(),
            }),
            "cash" => Ok(PaymentMethod::Cash),
            "m-pesa" | "mpesa" => Ok(PaymentMethod::MPesa),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["Cash".to_string(), "M-Pesa".to_string()],
            }),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Status of a persisted sale. Sales are immutable apart from voiding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
    Voided,
}

// =============================================================================
// Persisted Sale (receipt projection)
// =============================================================================

/// Header of a persisted sale as returned by `GET /sales/receipt/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleHeader {
    pub id: SaleId,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total_amount: Money,
    /// Printed verbatim ("Paid via: M-Pesa").
    pub payment_method: String,
    #[serde(default)]
    pub status: SaleStatus,
}

/// One persisted line of a sale, priced as it was sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub part_name: String,
    pub quantity: i64,
    /// Price the line was actually sold at.
    pub unit_price: Money,
    /// Catalog price when the line was added. Older sales may omit it.
    #[serde(default)]
    pub original_price: Option<Money>,
}

impl SaleItem {
    /// Original price, falling back to the sold price when not recorded.
    pub fn original_or_unit_price(&self) -> Money {
        self.original_price.unwrap_or(self.unit_price)
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Read-only receipt projection: the only source of truth for printing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub header: SaleHeader,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
