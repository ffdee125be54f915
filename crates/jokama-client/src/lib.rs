//! # jokama-client: Sales API Client
//!
//! JSON-over-HTTP access to the shop backend: the parts catalog, sale
//! submission and receipt retrieval.
//!
//! ## Endpoints
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ GET  /parts                  │ catalog list                             │
//! │ POST /sales/checkout         │ persist a sale → { success, saleId }     │
//! │ GET  /sales/receipt/{id}     │ persisted sale → { header, items }       │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! The terminal talks to the backend only through [`SalesApi`], so tests
//! can substitute an in-memory implementation.

pub mod client;
pub mod error;
pub mod protocol;

pub use client::{ClientSettings, HttpSalesApi, SalesApi, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
pub use protocol::{CheckoutLine, CheckoutRequest, CheckoutResponse};
