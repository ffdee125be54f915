//! # Jokama Terminal Library
//!
//! Counter-terminal session for the JOKAMA spare-parts shop: catalog, cart,
//! checkout and receipt printing behind one [`Terminal`] facade.
//!
//! ## Module Organization
//! ```text
//! jokama_terminal/
//! ├── lib.rs          ◄─── You are here (Terminal facade & tracing)
//! ├── config.rs       ◄─── TOML + env configuration
//! ├── error.rs        ◄─── TerminalError and front-end payload
//! ├── checkout.rs     ◄─── Cart → persisted sale → receipt job
//! ├── state/
//! │   ├── cart.rs     ◄─── Shared cart store
//! │   └── catalog.rs  ◄─── Cached parts list
//! └── print/
//!     ├── guard.rs    ◄─── Single print slot
//!     ├── surface.rs  ◄─── Off-screen print targets
//!     └── receipt.rs  ◄─── Receipt job state machine
//! ```
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  refresh_catalog() ──► add_to_cart(id) ──► set_line_price(id, "800")    │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                        cart_view()  (lines + totals)                    │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                      checkout("M-Pesa")                                 │
//! │                              │                                          │
//! │              ┌───────────────┴───────────────┐                          │
//! │              ▼                               ▼                          │
//! │        cart cleared                  receipt job opened                 │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                  fetch ─► render ─► print               │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                     catalog refreshed                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod print;
pub mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jokama_client::{HttpSalesApi, SalesApi};
use jokama_core::validation::{
    validate_part_id, validate_payment_method, validate_sale_id, validate_search_term,
};
use jokama_core::Part;

pub use checkout::{CheckoutCoordinator, CheckoutReceipt};
pub use config::{SpoolFormat, TerminalConfig};
pub use error::{ErrorCode, ErrorPayload, TerminalError, TerminalResult};
pub use print::{
    PrintDispatch, PrintJobGuard, PrintSurface, PrintTiming, ReceiptJobHandle, ReceiptOutcome,
    ReceiptRenderer, ReceiptState, SpoolSurface,
};
pub use state::{CartStore, CartView, CatalogState};

/// One counter session.
#[derive(Debug)]
pub struct Terminal {
    config: TerminalConfig,
    catalog: CatalogState,
    cart: CartStore,
    receipts: ReceiptRenderer,
    checkout: CheckoutCoordinator,
}

impl Terminal {
    /// Builds a terminal against the configured backend and spool printer,
    /// then loads the catalog. A catalog failure is logged, not fatal.
    pub async fn bootstrap(config: TerminalConfig) -> TerminalResult<Self> {
        config.validate()?;

        let api = HttpSalesApi::new(&config.client_settings())
            .map_err(|e| TerminalError::InvalidConfig(e.to_string()))?;
        let surface = SpoolSurface::from_settings(&config.print);
        info!(
            terminal_id = %config.terminal_id(),
            base_url = %api.base_url(),
            spool_dir = %surface.spool_dir().display(),
            "Starting Jokama terminal"
        );

        let terminal = Self::with_services(config, Arc::new(api), Arc::new(surface));
        if let Err(e) = terminal.refresh_catalog().await {
            warn!(error = %e, "Starting with an empty catalog");
        }
        Ok(terminal)
    }

    /// Builds a terminal over explicit backend and print surface.
    pub fn with_services(
        config: TerminalConfig,
        api: Arc<dyn SalesApi>,
        surface: Arc<dyn PrintSurface>,
    ) -> Self {
        let catalog = CatalogState::new(Arc::clone(&api));
        let cart = CartStore::new();
        let receipts = ReceiptRenderer::new(
            Arc::clone(&api),
            surface,
            PrintJobGuard::new(),
            config.shop_identity(),
            PrintTiming::from_config(&config),
        );
        let checkout = CheckoutCoordinator::new(api, cart.clone(), receipts.clone());

        Terminal {
            config,
            catalog,
            cart,
            receipts,
            checkout,
        }
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn print_guard(&self) -> &PrintJobGuard {
        self.receipts.guard()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn refresh_catalog(&self) -> TerminalResult<usize> {
        self.catalog.refresh().await
    }

    pub fn search_catalog(&self, term: &str) -> TerminalResult<Vec<Part>> {
        let term = validate_search_term(term)?;
        Ok(self.catalog.search(&term))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Adds one unit of a catalog part, reading its price and stock as they
    /// are right now.
    pub fn add_to_cart(&self, part_id: i64) -> TerminalResult<CartView> {
        let part_id = validate_part_id(part_id)?;
        let part = self
            .catalog
            .get(part_id)
            .ok_or(TerminalError::PartNotFound(part_id))?;

        if let Err(e) = self.cart.add_part(&part) {
            warn!(%part_id, error = %e, "Add to cart refused");
            return Err(e.into());
        }
        Ok(self.cart.view())
    }

    /// Deletes the line. Absent lines are ignored.
    pub fn remove_from_cart(&self, part_id: i64) -> TerminalResult<CartView> {
        let part_id = validate_part_id(part_id)?;
        self.cart.remove(part_id);
        Ok(self.cart.view())
    }

    /// Overrides the line's selling price with operator input. Unparseable
    /// input prices the line at zero; prices above
    /// [`jokama_core::MAX_UNIT_PRICE`] are refused and the line is kept.
    pub fn set_line_price(&self, part_id: i64, raw: &str) -> TerminalResult<CartView> {
        let part_id = validate_part_id(part_id)?;
        self.cart.set_price(part_id, raw)?;
        Ok(self.cart.view())
    }

    pub fn cart_view(&self) -> CartView {
        self.cart.view()
    }

    // =========================================================================
    // Checkout & Receipts
    // =========================================================================

    /// Submits the cart. The catalog is refreshed once the receipt job ends,
    /// or straight away if no job could be opened.
    pub async fn checkout(&self, payment_method: &str) -> TerminalResult<CheckoutReceipt> {
        let payment_method = validate_payment_method(payment_method)?;

        let receipt = self
            .checkout
            .submit(payment_method, Some(self.refresh_after_receipt()))
            .await?;

        if receipt.receipt_job.is_none() {
            if let Err(e) = self.refresh_catalog().await {
                warn!(error = %e, "Catalog refresh after sale failed");
            }
        }
        Ok(receipt)
    }

    /// Prints the receipt of an earlier sale.
    pub fn reprint(&self, sale_id: i64) -> TerminalResult<ReceiptJobHandle> {
        let sale_id = validate_sale_id(sale_id)?;
        info!(%sale_id, "Reprint requested");
        Ok(self.receipts.open(sale_id, None)?)
    }

    fn refresh_after_receipt(&self) -> print::CompletionCallback {
        let catalog = self.catalog.clone();
        Box::new(move |outcome: &ReceiptOutcome| {
            info!(
                sale_id = %outcome.sale_id(),
                printed = outcome.is_printed(),
                spooled = outcome.is_spooled(),
                "Receipt view closed"
            );
            tokio::spawn(async move {
                // Failures are already logged by the catalog.
                let _ = catalog.refresh().await;
            });
        })
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=jokama=trace` - Show trace for jokama crates only
/// - Default: `info,jokama=debug,reqwest=warn`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,jokama=debug,reqwest=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
