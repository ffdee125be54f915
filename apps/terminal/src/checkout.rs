//! # Checkout
//!
//! Turns the cart into a persisted sale, then hands the sale to the receipt
//! renderer.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  submit(method)                                                         │
//! │     │                                                                   │
//! │     ├── cart empty? ──────────────────────────► EmptyCart (no request)  │
//! │     │                                                                   │
//! │     ├── snapshot cart, summarize, build CheckoutRequest                 │
//! │     │                                                                   │
//! │     ├── POST /sales/checkout (once)                                     │
//! │     │      │                                                            │
//! │     │      ├── failure ───────────────────────► CheckoutFailed          │
//! │     │      │                                    (cart untouched)        │
//! │     │      ▼                                                            │
//! │     │   saleId                                                          │
//! │     │                                                                   │
//! │     ├── clear cart                                                      │
//! │     ├── open receipt job (waits while another sale is printing)         │
//! │     ▼                                                                   │
//! │  CheckoutReceipt { sale_id, summary, receipt_job }                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no submit lock and no idempotency key: a second submit while the
//! first is in flight posts a second sale. Stock is re-validated by the
//! backend.

use std::sync::Arc;
use tracing::{info, warn};

use jokama_client::{CheckoutRequest, SalesApi};
use jokama_core::{CoreError, PaymentMethod, PricingEngine, PricingSummary, SaleId};

use crate::error::{TerminalError, TerminalResult};
use crate::print::{CompletionCallback, ReceiptJobHandle, ReceiptRenderer};
use crate::state::CartStore;

/// Result of a successful checkout.
#[derive(Debug)]
pub struct CheckoutReceipt {
    pub sale_id: SaleId,
    /// Totals as submitted, rounded for display.
    pub summary: PricingSummary,
    /// `None` only if a job for this very sale was already running.
    pub receipt_job: Option<ReceiptJobHandle>,
}

impl CheckoutReceipt {
    pub fn invoice_number(&self) -> String {
        self.sale_id.invoice_number()
    }
}

#[derive(Clone)]
pub struct CheckoutCoordinator {
    api: Arc<dyn SalesApi>,
    cart: CartStore,
    receipts: ReceiptRenderer,
    pricing: PricingEngine,
}

impl CheckoutCoordinator {
    pub fn new(api: Arc<dyn SalesApi>, cart: CartStore, receipts: ReceiptRenderer) -> Self {
        CheckoutCoordinator {
            api,
            cart,
            receipts,
            pricing: PricingEngine::new(),
        }
    }

    /// Submits the current cart as a sale.
    ///
    /// `on_receipt_done` is passed to the receipt job and fires once when it
    /// ends. It is dropped unused if no job could be opened.
    ///
    /// If the printer is still busy with an earlier sale, this waits for that
    /// job to finish before opening the new one. The sale is already saved
    /// and the cart cleared while it waits.
    pub async fn submit(
        &self,
        payment_method: PaymentMethod,
        on_receipt_done: Option<CompletionCallback>,
    ) -> TerminalResult<CheckoutReceipt> {
        let cart = self.cart.snapshot();
        if cart.is_empty() {
            warn!("Checkout refused: cart is empty");
            return Err(CoreError::EmptyCart.into());
        }

        let summary = self.pricing.summarize(&cart);
        let request = CheckoutRequest::new(&cart, &summary, payment_method);
        info!(
            lines = request.cart.len(),
            total = %summary.total_amount.rounded(),
            payment_method = %payment_method,
            "Submitting checkout"
        );

        let sale_id = self.api.checkout(&request).await.map_err(|e| {
            warn!(error = %e, "Checkout failed; cart kept");
            TerminalError::CheckoutFailed(e)
        })?;

        self.cart.clear();
        info!(%sale_id, invoice = %sale_id.invoice_number(), "Sale completed");

        let receipt_job = match self.receipts.open_when_free(sale_id, on_receipt_done).await {
            Ok(job) => Some(job),
            Err(e) => {
                warn!(%sale_id, reason = %e, "Sale saved but receipt not printed");
                None
            }
        };

        Ok(CheckoutReceipt {
            sale_id,
            summary: summary.rounded(),
            receipt_job,
        })
    }
}

impl std::fmt::Debug for CheckoutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutCoordinator")
            .field("cart", &self.cart)
            .field("receipts", &self.receipts)
            .finish_non_exhaustive()
    }
}
