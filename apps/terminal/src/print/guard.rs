//! # Print Job Guard
//!
//! Single-slot lock that keeps the terminal from printing the same receipt
//! twice when the receipt view is triggered twice in quick succession.
//!
//! ## Slot Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   acquire(42) ──► slot: None ──► slot: Some(42, token A) ──► Permit A  │
//! │   acquire(42) ──► slot: Some(42, ..) ──► AlreadyActive (no-op)          │
//! │   acquire(43) ──► slot: Some(42, ..) ──► Busy                           │
//! │   acquire_when_free(43) ──► Busy ──► wait for release ──► retry        │
//! │                                                                         │
//! │   Permit A released (explicitly, on cancel, or on drop)                 │
//! │      slot holds token A?  yes ──► slot: None                            │
//! │                           no  ──► untouched (someone else owns it)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Check-then-set happens under one lock, so two callers can never both
//! observe an empty slot.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use jokama_core::SaleId;

/// Why a receipt job could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardError {
    /// A job for this very sale is already running. Callers treat this as a
    /// no-op.
    #[error("Receipt for sale {0} is already printing")]
    AlreadyActive(SaleId),

    /// A job for a different sale is running.
    #[error("Printer busy with sale {active}; cannot print sale {requested}")]
    Busy { requested: SaleId, active: SaleId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveJob {
    sale_id: SaleId,
    token: Uuid,
}

/// Cloneable handle to the terminal's single print slot.
#[derive(Debug, Clone, Default)]
pub struct PrintJobGuard {
    slot: Arc<Mutex<Option<ActiveJob>>>,
    released: Arc<Notify>,
}

impl PrintJobGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `sale_id`.
    pub fn acquire(&self, sale_id: SaleId) -> Result<PrintJobPermit, GuardError> {
        let mut slot = self.slot.lock();
        match *slot {
            Some(active) if active.sale_id == sale_id => Err(GuardError::AlreadyActive(sale_id)),
            Some(active) => Err(GuardError::Busy {
                requested: sale_id,
                active: active.sale_id,
            }),
            None => {
                let job = ActiveJob {
                    sale_id,
                    token: Uuid::new_v4(),
                };
                *slot = Some(job);
                debug!(%sale_id, token = %job.token, "Print slot acquired");
                Ok(PrintJobPermit {
                    guard: self.clone(),
                    job,
                    released: false,
                })
            }
        }
    }

    /// Claims the slot for `sale_id`, waiting while another sale holds it.
    ///
    /// Waiters are woken on every release and race for the slot again, so
    /// the order among several waiters is unspecified.
    ///
    /// ## Errors
    /// `GuardError::AlreadyActive` if this sale is printing already.
    pub async fn acquire_when_free(&self, sale_id: SaleId) -> Result<PrintJobPermit, GuardError> {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            // Registered before the attempt so a release in between is not missed.
            released.as_mut().enable();

            match self.acquire(sale_id) {
                Err(GuardError::Busy { active, .. }) => {
                    debug!(%sale_id, %active, "Waiting for print slot");
                    released.await;
                }
                other => return other,
            }
        }
    }

    /// Sale currently holding the slot.
    pub fn active(&self) -> Option<SaleId> {
        self.slot.lock().as_ref().map(|job| job.sale_id)
    }

    pub fn is_idle(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn release_token(&self, job: ActiveJob) {
        let freed = {
            let mut slot = self.slot.lock();
            let owned = *slot == Some(job);
            if owned {
                *slot = None;
            }
            owned
        };
        if freed {
            debug!(sale_id = %job.sale_id, token = %job.token, "Print slot released");
            self.released.notify_waiters();
        }
    }
}

/// Proof of slot ownership. Releases the slot when released or dropped.
#[derive(Debug)]
pub struct PrintJobPermit {
    guard: PrintJobGuard,
    job: ActiveJob,
    released: bool,
}

impl PrintJobPermit {
    pub fn sale_id(&self) -> SaleId {
        self.job.sale_id
    }

    /// Opaque token distinguishing this job from later jobs for the same
    /// sale.
    pub fn token(&self) -> Uuid {
        self.job.token
    }

    /// Frees the slot if this permit still owns it.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.guard.release_token(self.job);
        }
    }
}

impl Drop for PrintJobPermit {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_sale_is_already_active() {
        let guard = PrintJobGuard::new();
        let permit = guard.acquire(SaleId(42)).unwrap();

        assert_eq!(
            guard.acquire(SaleId(42)).unwrap_err(),
            GuardError::AlreadyActive(SaleId(42))
        );
        assert_eq!(guard.active(), Some(SaleId(42)));
        drop(permit);
        assert!(guard.is_idle());
    }

    #[test]
    fn test_other_sale_is_busy() {
        let guard = PrintJobGuard::new();
        let _permit = guard.acquire(SaleId(1)).unwrap();

        assert_eq!(
            guard.acquire(SaleId(2)).unwrap_err(),
            GuardError::Busy {
                requested: SaleId(2),
                active: SaleId(1)
            }
        );
    }

    #[test]
    fn test_release_frees_slot_for_next_job() {
        let guard = PrintJobGuard::new();
        guard.acquire(SaleId(1)).unwrap().release();

        let second = guard.acquire(SaleId(1)).unwrap();
        assert_eq!(second.sale_id(), SaleId(1));
    }

    #[test]
    fn test_stale_permit_does_not_clear_newer_job() {
        let guard = PrintJobGuard::new();
        let first = guard.acquire(SaleId(1)).unwrap();
        let first_job = first.job;
        first.release();

        let second = guard.acquire(SaleId(1)).unwrap();
        assert_ne!(second.token(), first_job.token);

        // A late release carrying the old token leaves the new job alone.
        guard.release_token(first_job);
        assert_eq!(guard.active(), Some(SaleId(1)));
    }

    #[tokio::test]
    async fn test_waiter_gets_slot_after_release() {
        let guard = PrintJobGuard::new();
        let first = guard.acquire(SaleId(1)).unwrap();

        let waiter = tokio::spawn({
            let guard = guard.clone();
            async move { guard.acquire_when_free(SaleId(2)).await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        assert_eq!(guard.active(), Some(SaleId(1)));

        first.release();
        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.sale_id(), SaleId(2));
        assert_eq!(guard.active(), Some(SaleId(2)));
    }

    #[tokio::test]
    async fn test_waiting_for_own_sale_is_already_active() {
        let guard = PrintJobGuard::new();
        let _permit = guard.acquire(SaleId(5)).unwrap();

        assert_eq!(
            guard.acquire_when_free(SaleId(5)).await.unwrap_err(),
            GuardError::AlreadyActive(SaleId(5))
        );
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let guard = PrintJobGuard::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.acquire(SaleId(9)).ok())
            })
            .collect();

        let permits: Vec<PrintJobPermit> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(permits.len(), 1);
    }
}
