//! # Session State
//!
//! Focused state types instead of one big session struct:
//!
//! ```text
//! ┌──────────────────────┐ ┌──────────────────────┐
//! │    CatalogState      │ │     CartStore        │
//! │                      │ │                      │
//! │  • Last parts list   │ │  • Current cart      │
//! │  • Search            │ │  • Totals view       │
//! └──────────────────────┘ └──────────────────────┘
//! ```

pub mod cart;
pub mod catalog;

pub use cart::{CartStore, CartView};
pub use catalog::CatalogState;
