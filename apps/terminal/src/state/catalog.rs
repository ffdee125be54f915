//! # Catalog State
//!
//! Last parts list fetched from the backend. The cart reads parts from here
//! at the moment they are added.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use jokama_client::SalesApi;
use jokama_core::{Part, PartId};

use crate::error::{TerminalError, TerminalResult};

#[derive(Default)]
struct Snapshot {
    parts: Vec<Part>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Cached parts catalog. Reads are frequent, refreshes rare, hence the
/// `RwLock`.
#[derive(Clone)]
pub struct CatalogState {
    api: Arc<dyn SalesApi>,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl CatalogState {
    pub fn new(api: Arc<dyn SalesApi>) -> Self {
        CatalogState {
            api,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    /// Replaces the cached list with a fresh `GET /parts`. On failure the
    /// previous list is kept.
    pub async fn refresh(&self) -> TerminalResult<usize> {
        let parts = match self.api.list_parts().await {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "Catalog refresh failed; keeping previous list");
                return Err(TerminalError::Catalog(e));
            }
        };

        let count = parts.len();
        let mut snapshot = self.snapshot.write();
        snapshot.parts = parts;
        snapshot.refreshed_at = Some(Utc::now());
        info!(parts = count, "Catalog refreshed");
        Ok(count)
    }

    pub fn get(&self, id: PartId) -> Option<Part> {
        self.snapshot.read().parts.iter().find(|p| p.id == id).cloned()
    }

    /// Case-insensitive match on part name or OEM number. An empty term
    /// returns everything.
    pub fn search(&self, term: &str) -> Vec<Part> {
        let hits: Vec<Part> = self
            .snapshot
            .read()
            .parts
            .iter()
            .filter(|p| p.matches(term))
            .cloned()
            .collect();
        debug!(term, hits = hits.len(), "Catalog search");
        hits
    }

    pub fn parts(&self) -> Vec<Part> {
        self.snapshot.read().parts.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().refreshed_at
    }
}

impl std::fmt::Debug for CatalogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogState")
            .field("parts", &self.len())
            .field("refreshed_at", &self.refreshed_at())
            .finish()
    }
}
