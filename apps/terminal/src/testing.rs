//! In-memory stand-ins for the sales backend and the print surface.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use jokama_client::{CheckoutRequest, ClientError, ClientResult, SalesApi};
use jokama_core::pricing::split_vat;
use jokama_core::{
    Money, Part, PartId, Receipt, RenderedReceipt, SaleHeader, SaleId, SaleItem, SaleStatus,
};

use crate::print::{PrintDispatch, PrintError, PrintSurface, SurfaceHandle};

pub fn part(id: i64, name: &str, price: i64, stock: i64) -> Part {
    Part {
        id: PartId(id),
        part_name: name.to_string(),
        oem_number: format!("OEM-{}", id),
        sale_price: Money::from_major(price),
        stock_quantity: stock,
        buying_price: None,
        category: None,
    }
}

/// Sale `id`: three oil filters at 800, listed at 1,000.
pub fn sample_receipt(id: i64) -> Receipt {
    let items = vec![SaleItem {
        part_name: "Oil Filter".to_string(),
        quantity: 3,
        unit_price: Money::from_major(800),
        original_price: Some(Money::from_major(1000)),
    }];
    let total: Money = items.iter().map(SaleItem::line_total).sum();
    let (subtotal, vat) = split_vat(total);
    Receipt {
        header: SaleHeader {
            id: SaleId(id),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            subtotal: subtotal.rounded(),
            vat_amount: vat.rounded(),
            total_amount: total,
            payment_method: "Cash".to_string(),
            status: SaleStatus::Completed,
        },
        items,
    }
}

// =============================================================================
// Sales API
// =============================================================================

/// What the fake backend answers to a checkout.
#[derive(Debug, Clone)]
pub enum CheckoutScript {
    Accept(SaleId),
    Reject(String),
    Status(u16, String),
    Offline,
}

pub struct FakeSalesApi {
    parts: Mutex<Vec<Part>>,
    receipts: Mutex<HashMap<SaleId, Receipt>>,
    checkout: Mutex<CheckoutScript>,
    last_request: Mutex<Option<CheckoutRequest>>,
    fetch_delay: Mutex<Duration>,
    list_calls: AtomicUsize,
    checkout_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl FakeSalesApi {
    pub fn new() -> Self {
        FakeSalesApi {
            parts: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
            checkout: Mutex::new(CheckoutScript::Accept(SaleId(1))),
            last_request: Mutex::new(None),
            fetch_delay: Mutex::new(Duration::ZERO),
            list_calls: AtomicUsize::new(0),
            checkout_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_parts(parts: Vec<Part>) -> Self {
        let api = Self::new();
        *api.parts.lock() = parts;
        api
    }

    pub fn set_parts(&self, parts: Vec<Part>) {
        *self.parts.lock() = parts;
    }

    pub fn add_receipt(&self, receipt: Receipt) {
        self.receipts.lock().insert(receipt.header.id, receipt);
    }

    pub fn script_checkout(&self, script: CheckoutScript) {
        *self.checkout.lock() = script;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = delay;
    }

    pub fn last_request(&self) -> Option<CheckoutRequest> {
        self.last_request.lock().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn checkout_calls(&self) -> usize {
        self.checkout_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SalesApi for FakeSalesApi {
    async fn list_parts(&self) -> ClientResult<Vec<Part>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.parts.lock().clone())
    }

    async fn checkout(&self, request: &CheckoutRequest) -> ClientResult<SaleId> {
        self.checkout_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());
        let script = self.checkout.lock().clone();
        match script {
            CheckoutScript::Accept(id) => Ok(id),
            CheckoutScript::Reject(msg) => Err(ClientError::Rejected(msg)),
            CheckoutScript::Status(status, message) => Err(ClientError::Server { status, message }),
            CheckoutScript::Offline => Err(ClientError::Network("connection refused".to_string())),
        }
    }

    async fn fetch_receipt(&self, sale_id: SaleId) -> ClientResult<Receipt> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let found = self.receipts.lock().get(&sale_id).cloned();
        found.ok_or(ClientError::Server {
            status: 404,
            message: "Sale not found".to_string(),
        })
    }
}

// =============================================================================
// Print Surface
// =============================================================================

/// Counts surface calls and stamps each with the (possibly paused) clock.
pub struct RecordingSurface {
    fail_print: bool,
    mounted: Mutex<Vec<String>>,
    timeline: Mutex<Vec<Instant>>,
    mounts: AtomicUsize,
    prints: AtomicUsize,
    teardowns: AtomicUsize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        RecordingSurface {
            fail_print: false,
            mounted: Mutex::new(Vec::new()),
            timeline: Mutex::new(Vec::new()),
            mounts: AtomicUsize::new(0),
            prints: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
        }
    }

    pub fn failing_print() -> Self {
        RecordingSurface {
            fail_print: true,
            ..Self::new()
        }
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn print_count(&self) -> usize {
        self.prints.load(Ordering::SeqCst)
    }

    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn last_mounted_html(&self) -> Option<String> {
        self.mounted.lock().last().cloned()
    }

    /// Mount, print and teardown instants, in call order.
    pub fn timeline(&self) -> Vec<Instant> {
        self.timeline.lock().clone()
    }

    fn stamp(&self) {
        self.timeline.lock().push(Instant::now());
    }
}

#[async_trait]
impl PrintSurface for RecordingSurface {
    async fn mount(&self, receipt: &RenderedReceipt) -> Result<SurfaceHandle, PrintError> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        self.mounted.lock().push(receipt.html.clone());
        self.stamp();
        Ok(SurfaceHandle::new(receipt.sale_id, None))
    }

    async fn print(&self, _handle: &SurfaceHandle) -> Result<PrintDispatch, PrintError> {
        self.stamp();
        if self.fail_print {
            return Err(PrintError::Dispatch("printer offline".to_string()));
        }
        self.prints.fetch_add(1, Ordering::SeqCst);
        Ok(PrintDispatch::Sent)
    }

    async fn teardown(&self, _handle: SurfaceHandle) -> Result<(), PrintError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        self.stamp();
        Ok(())
    }
}
