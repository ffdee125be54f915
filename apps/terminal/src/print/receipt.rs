//! # Receipt Renderer
//!
//! Runs one receipt job per sale: fetch the persisted sale, render it, and
//! print it on an isolated surface.
//!
//! ## Job State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open(sale_id)            AlreadyActive / Busy ──► no job              │
//! │   open_when_free(sale_id)  Busy ──► wait; AlreadyActive ──► no job      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   ┌──────┐    ┌──────────┐    ┌───────────┐    ┌──────────┐    ┌──────┐│
//! │   │ Init │───►│ Fetching │───►│ Rendering │───►│ Printing │───►│ Done ││
//! │   └──────┘    └────┬─────┘    └─────┬─────┘    └────┬─────┘    └──────┘│
//! │                    │                │               │                   │
//! │                    │ fetch error    │ render error  │ mount/print error │
//! │                    │ cancel         │ cancel        │ cancel (before    │
//! │                    ▼                ▼               ▼  dispatch only)   │
//! │                 ┌──────────────────────────────────────┐                │
//! │                 │               Aborted                │                │
//! │                 └──────────────────────────────────────┘                │
//! │                                                                         │
//! │  Printing: mount ─► wait settle (500ms) ─► print ─► wait (1000ms) ─►   │
//! │            teardown                                                     │
//! │            (print reports Spooled: surface kept, no teardown)           │
//! │                                                                         │
//! │  Every exit: guard released, completion callback invoked exactly once. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard is taken inside [`ReceiptRenderer::open`] before any task is
//! spawned, so two rapid triggers for the same sale produce one fetch and one
//! print.

use chrono::FixedOffset;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use jokama_client::{ClientError, SalesApi};
use jokama_core::{ReceiptDocument, SaleId, ShopIdentity};

use super::guard::{GuardError, PrintJobGuard, PrintJobPermit};
use super::surface::{PrintDispatch, PrintError, PrintSurface, SurfaceHandle};
use crate::config::TerminalConfig;

// =============================================================================
// States and Outcomes
// =============================================================================

/// Where a receipt job is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptState {
    Init,
    Fetching,
    Rendering,
    Printing,
    Done,
    Aborted,
}

impl ReceiptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReceiptState::Done | ReceiptState::Aborted)
    }

    /// Legal forward moves. Nothing leaves a terminal state and the
    /// fetch → render → print order is never skipped.
    fn can_transition_to(&self, next: ReceiptState) -> bool {
        use ReceiptState::*;
        matches!(
            (self, next),
            (Init, Fetching)
                | (Fetching, Rendering)
                | (Rendering, Printing)
                | (Printing, Done)
                | (Init | Fetching | Rendering | Printing, Aborted)
        )
    }
}

impl fmt::Display for ReceiptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReceiptState::Init => "init",
            ReceiptState::Fetching => "fetching",
            ReceiptState::Rendering => "rendering",
            ReceiptState::Printing => "printing",
            ReceiptState::Done => "done",
            ReceiptState::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Why a receipt job failed.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Could not load receipt: {0}")]
    Fetch(#[source] ClientError),

    #[error("Could not render receipt: {0}")]
    Render(String),

    #[error(transparent)]
    Print(#[from] PrintError),

    /// The job task itself died.
    #[error("Receipt job interrupted: {0}")]
    Interrupted(String),
}

/// How a receipt job ended.
#[derive(Debug)]
pub enum ReceiptOutcome {
    /// Print dispatched and surface torn down.
    Printed(SaleId),
    /// No print action available. The receipt stays on its surface (the
    /// spool file) for manual printing.
    Spooled(SaleId),
    /// Cancelled before the print action was dispatched.
    Cancelled(SaleId),
    Failed { sale_id: SaleId, error: ReceiptError },
}

impl ReceiptOutcome {
    pub fn sale_id(&self) -> SaleId {
        match self {
            ReceiptOutcome::Printed(id)
            | ReceiptOutcome::Spooled(id)
            | ReceiptOutcome::Cancelled(id) => *id,
            ReceiptOutcome::Failed { sale_id, .. } => *sale_id,
        }
    }

    pub fn is_printed(&self) -> bool {
        matches!(self, ReceiptOutcome::Printed(_))
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self, ReceiptOutcome::Spooled(_))
    }
}

/// Invoked once when the job ends, whatever the outcome. The receipt view
/// closes itself from here.
pub type CompletionCallback = Box<dyn FnOnce(&ReceiptOutcome) + Send + 'static>;

// =============================================================================
// Timing
// =============================================================================

/// Delays and clock used by receipt jobs.
#[derive(Debug, Clone, Copy)]
pub struct PrintTiming {
    pub settle_delay: Duration,
    pub teardown_delay: Duration,
    pub utc_offset: FixedOffset,
}

impl PrintTiming {
    pub fn from_config(config: &TerminalConfig) -> Self {
        PrintTiming {
            settle_delay: config.print.settle_delay(),
            teardown_delay: config.print.teardown_delay(),
            utc_offset: config.print.utc_offset(),
        }
    }
}

impl Default for PrintTiming {
    fn default() -> Self {
        PrintTiming::from_config(&TerminalConfig::default())
    }
}

// =============================================================================
// Job Handle
// =============================================================================

/// Caller's view of a running receipt job.
#[derive(Debug)]
pub struct ReceiptJobHandle {
    sale_id: SaleId,
    stage: watch::Receiver<ReceiptState>,
    cancel: CancellationToken,
    permit: Arc<Mutex<Option<PrintJobPermit>>>,
    task: JoinHandle<ReceiptOutcome>,
}

impl ReceiptJobHandle {
    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    /// Current stage.
    pub fn stage(&self) -> ReceiptState {
        *self.stage.borrow()
    }

    /// Receiver for watching stage changes.
    pub fn subscribe(&self) -> watch::Receiver<ReceiptState> {
        self.stage.clone()
    }

    /// Cancels the job.
    ///
    /// The print slot is freed immediately. A fetch in flight is abandoned
    /// and its late result discarded; a mounted surface is torn down. A print
    /// that was already dispatched still completes.
    pub fn cancel(&self) {
        info!(sale_id = %self.sale_id, "Receipt job cancelled");
        self.cancel.cancel();
        if let Some(permit) = self.permit.lock().take() {
            permit.release();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for the job to end.
    pub async fn finished(self) -> ReceiptOutcome {
        let sale_id = self.sale_id;
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%sale_id, error = %e, "Receipt job task failed");
                ReceiptOutcome::Failed {
                    sale_id,
                    error: ReceiptError::Interrupted(e.to_string()),
                }
            }
        }
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Opens receipt jobs. Cheap to clone; all clones share one print slot.
#[derive(Clone)]
pub struct ReceiptRenderer {
    api: Arc<dyn SalesApi>,
    surface: Arc<dyn PrintSurface>,
    guard: PrintJobGuard,
    shop: ShopIdentity,
    timing: PrintTiming,
}

impl ReceiptRenderer {
    pub fn new(
        api: Arc<dyn SalesApi>,
        surface: Arc<dyn PrintSurface>,
        guard: PrintJobGuard,
        shop: ShopIdentity,
        timing: PrintTiming,
    ) -> Self {
        ReceiptRenderer {
            api,
            surface,
            guard,
            shop,
            timing,
        }
    }

    pub fn guard(&self) -> &PrintJobGuard {
        &self.guard
    }

    /// Starts a receipt job for `sale_id`.
    ///
    /// ## Errors
    /// - `GuardError::AlreadyActive`: this sale is already printing (no-op)
    /// - `GuardError::Busy`: another sale is printing
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        &self,
        sale_id: SaleId,
        on_complete: Option<CompletionCallback>,
    ) -> Result<ReceiptJobHandle, GuardError> {
        let permit = self.guard.acquire(sale_id).map_err(|e| {
            warn!(%sale_id, reason = %e, "Receipt job not opened");
            e
        })?;
        Ok(self.spawn_job(permit, on_complete))
    }

    /// Like [`open`](Self::open), but queues behind a job for another sale
    /// instead of refusing. Used after checkout so every new sale gets its
    /// receipt.
    ///
    /// ## Errors
    /// `GuardError::AlreadyActive` if this sale is already printing.
    pub async fn open_when_free(
        &self,
        sale_id: SaleId,
        on_complete: Option<CompletionCallback>,
    ) -> Result<ReceiptJobHandle, GuardError> {
        let permit = self.guard.acquire_when_free(sale_id).await.map_err(|e| {
            warn!(%sale_id, reason = %e, "Receipt job not opened");
            e
        })?;
        Ok(self.spawn_job(permit, on_complete))
    }

    fn spawn_job(
        &self,
        permit: PrintJobPermit,
        on_complete: Option<CompletionCallback>,
    ) -> ReceiptJobHandle {
        let sale_id = permit.sale_id();
        let (stage_tx, stage_rx) = watch::channel(ReceiptState::Init);
        let cancel = CancellationToken::new();
        let permit = Arc::new(Mutex::new(Some(permit)));

        let job = ReceiptJob {
            sale_id,
            api: Arc::clone(&self.api),
            surface: Arc::clone(&self.surface),
            shop: self.shop.clone(),
            timing: self.timing,
            stage: stage_tx,
            cancel: cancel.clone(),
            permit: Arc::clone(&permit),
        };

        info!(%sale_id, "Receipt job opened");
        let task = tokio::spawn(job.run(on_complete));

        ReceiptJobHandle {
            sale_id,
            stage: stage_rx,
            cancel,
            permit,
            task,
        }
    }
}

impl fmt::Debug for ReceiptRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptRenderer")
            .field("guard", &self.guard)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Job Task
// =============================================================================

/// Everything one job task owns.
struct ReceiptJob {
    sale_id: SaleId,
    api: Arc<dyn SalesApi>,
    surface: Arc<dyn PrintSurface>,
    shop: ShopIdentity,
    timing: PrintTiming,
    stage: watch::Sender<ReceiptState>,
    cancel: CancellationToken,
    permit: Arc<Mutex<Option<PrintJobPermit>>>,
}

/// Early exit from the pipeline.
enum Halt {
    Cancelled,
    Failed(ReceiptError),
}

impl From<ReceiptError> for Halt {
    fn from(err: ReceiptError) -> Self {
        Halt::Failed(err)
    }
}

impl ReceiptJob {
    async fn run(self, on_complete: Option<CompletionCallback>) -> ReceiptOutcome {
        let sale_id = self.sale_id;

        let outcome = match self.pipeline().await {
            Ok(PrintDispatch::Sent) => {
                self.advance(ReceiptState::Done);
                info!(%sale_id, "Receipt printed");
                ReceiptOutcome::Printed(sale_id)
            }
            Ok(PrintDispatch::Spooled) => {
                self.advance(ReceiptState::Done);
                warn!(%sale_id, "Receipt not printed; kept in spool");
                ReceiptOutcome::Spooled(sale_id)
            }
            Err(Halt::Cancelled) => {
                self.advance(ReceiptState::Aborted);
                info!(%sale_id, "Receipt job aborted by cancellation");
                ReceiptOutcome::Cancelled(sale_id)
            }
            Err(Halt::Failed(error)) => {
                self.advance(ReceiptState::Aborted);
                error!(%sale_id, %error, "Receipt job failed");
                ReceiptOutcome::Failed { sale_id, error }
            }
        };

        if let Some(permit) = self.permit.lock().take() {
            permit.release();
        }
        if let Some(callback) = on_complete {
            callback(&outcome);
        }
        outcome
    }

    async fn pipeline(&self) -> Result<PrintDispatch, Halt> {
        // Fetching
        self.checkpoint(ReceiptState::Fetching)?;
        let receipt = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Halt::Cancelled),
            fetched = self.api.fetch_receipt(self.sale_id) => fetched.map_err(ReceiptError::Fetch)?,
        };

        // Rendering
        self.checkpoint(ReceiptState::Rendering)?;
        let rendered = ReceiptDocument::build(&receipt, &self.shop, self.timing.utc_offset)
            .map_err(|e| ReceiptError::Render(e.to_string()))?
            .render();
        debug!(sale_id = %self.sale_id, lines = receipt.items.len(), "Receipt rendered");

        // Printing
        self.checkpoint(ReceiptState::Printing)?;
        let handle = self.surface.mount(&rendered).await.map_err(ReceiptError::from)?;

        let settled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.timing.settle_delay) => true,
        };
        if !settled {
            self.teardown(handle).await;
            return Err(Halt::Cancelled);
        }

        let dispatch = match self.surface.print(&handle).await {
            Ok(dispatch) => dispatch,
            Err(e) => {
                self.teardown(handle).await;
                return Err(Halt::Failed(e.into()));
            }
        };
        if dispatch == PrintDispatch::Spooled {
            return Ok(dispatch);
        }
        info!(sale_id = %self.sale_id, "Receipt sent to printer");

        // Dispatched: no cancellation from here on.
        tokio::time::sleep(self.timing.teardown_delay).await;
        self.teardown(handle).await;
        Ok(dispatch)
    }

    /// Moves to `next` unless the job was cancelled.
    fn checkpoint(&self, next: ReceiptState) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        self.advance(next);
        Ok(())
    }

    fn advance(&self, next: ReceiptState) {
        let current = *self.stage.borrow();
        if current.can_transition_to(next) {
            debug!(sale_id = %self.sale_id, from = %current, to = %next, "Receipt stage");
            self.stage.send_replace(next);
        } else {
            warn!(sale_id = %self.sale_id, from = %current, to = %next, "Ignored illegal receipt transition");
        }
    }

    async fn teardown(&self, handle: SurfaceHandle) {
        if let Err(e) = self.surface.teardown(handle).await {
            warn!(sale_id = %self.sale_id, error = %e, "Print surface teardown failed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
