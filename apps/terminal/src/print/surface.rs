//! # Print Surfaces
//!
//! An isolated place to put a rendered receipt while the platform prints it.
//!
//! ## Surface Lifecycle
//! ```text
//!   mount(receipt) ──► SurfaceHandle ──► print(&handle) ──► teardown(handle)
//!        │                                    │                   │
//!   SpoolSurface:                             │                   │
//!   write SAL-42.html                spawn `lp SAL-42.html`   delete file
//!   (or SAL-42.txt)                  (fire-and-forget)
//!   into spool dir                        │
//!                                         └─ no command: Spooled, the file
//!                                            stays and is not torn down
//! ```
//!
//! The surface never holds onto the cart or any UI state; it only sees the
//! rendered document.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use jokama_core::{RenderedReceipt, SaleId};

use crate::config::{PrintSettings, SpoolFormat};

/// Print surface failures. All are final for the job.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Failed to mount receipt: {0}")]
    Mount(String),

    #[error("Failed to dispatch print: {0}")]
    Dispatch(String),

    #[error("Failed to tear down print surface: {0}")]
    Teardown(String),
}

/// A mounted receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub id: Uuid,
    pub sale_id: SaleId,
    /// Backing file, for surfaces that spool to disk.
    pub path: Option<PathBuf>,
}

impl SurfaceHandle {
    pub fn new(sale_id: SaleId, path: Option<PathBuf>) -> Self {
        SurfaceHandle {
            id: Uuid::new_v4(),
            sale_id,
            path,
        }
    }
}

/// What `print` did with the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintDispatch {
    /// Handed to the platform print action.
    Sent,
    /// Nothing to print with. The surface stays mounted so the receipt can
    /// be printed by hand.
    Spooled,
}

/// Off-screen target for receipt printing.
#[async_trait]
pub trait PrintSurface: Send + Sync {
    /// Places the rendered document on a fresh, isolated surface.
    async fn mount(&self, receipt: &RenderedReceipt) -> Result<SurfaceHandle, PrintError>;

    /// Invokes the platform print action. Once this returns `Sent` the job
    /// is out of the terminal's hands.
    async fn print(&self, handle: &SurfaceHandle) -> Result<PrintDispatch, PrintError>;

    /// Removes the surface. Safe to call on a surface that was never printed.
    async fn teardown(&self, handle: SurfaceHandle) -> Result<(), PrintError>;
}

// =============================================================================
// Spool Surface
// =============================================================================

/// Writes each receipt as a file into a spool directory and optionally hands
/// it to a print command.
#[derive(Debug, Clone)]
pub struct SpoolSurface {
    spool_dir: PathBuf,
    format: SpoolFormat,
    command: Option<Vec<String>>,
}

impl SpoolSurface {
    /// `command` is split on whitespace; the file path is appended as the
    /// last argument.
    pub fn new(spool_dir: impl Into<PathBuf>, command: Option<&str>) -> Self {
        let command = command
            .map(|c| c.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());
        SpoolSurface {
            spool_dir: spool_dir.into(),
            format: SpoolFormat::default(),
            command,
        }
    }

    pub fn with_format(mut self, format: SpoolFormat) -> Self {
        self.format = format;
        self
    }

    pub fn from_settings(settings: &PrintSettings) -> Self {
        Self::new(settings.spool_dir_or_default(), settings.command.as_deref())
            .with_format(settings.format)
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    fn file_for(&self, receipt: &RenderedReceipt) -> PathBuf {
        self.spool_dir
            .join(format!("{}.{}", receipt.invoice_number, self.format.extension()))
    }

    fn body<'a>(&self, receipt: &'a RenderedReceipt) -> &'a str {
        match self.format {
            SpoolFormat::Html => &receipt.html,
            SpoolFormat::Text => &receipt.text,
        }
    }
}

#[async_trait]
impl PrintSurface for SpoolSurface {
    async fn mount(&self, receipt: &RenderedReceipt) -> Result<SurfaceHandle, PrintError> {
        tokio::fs::create_dir_all(&self.spool_dir)
            .await
            .map_err(|e| PrintError::Mount(format!("{}: {}", self.spool_dir.display(), e)))?;

        let path = self.file_for(receipt);
        tokio::fs::write(&path, self.body(receipt).as_bytes())
            .await
            .map_err(|e| PrintError::Mount(format!("{}: {}", path.display(), e)))?;

        debug!(sale_id = %receipt.sale_id, path = %path.display(), "Receipt spooled");
        Ok(SurfaceHandle::new(receipt.sale_id, Some(path)))
    }

    async fn print(&self, handle: &SurfaceHandle) -> Result<PrintDispatch, PrintError> {
        let path = handle
            .path
            .as_ref()
            .ok_or_else(|| PrintError::Dispatch("surface has no backing file".to_string()))?;

        let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
            info!(sale_id = %handle.sale_id, path = %path.display(), "No print command configured; receipt kept in spool");
            return Ok(PrintDispatch::Spooled);
        };

        // Not awaited: the print command runs to completion on its own.
        let child = tokio::process::Command::new(program)
            .args(args)
            .arg(path)
            .spawn()
            .map_err(|e| PrintError::Dispatch(format!("{}: {}", program, e)))?;

        info!(
            sale_id = %handle.sale_id,
            program = %program,
            pid = ?child.id(),
            "Print dispatched"
        );
        Ok(PrintDispatch::Sent)
    }

    async fn teardown(&self, handle: SurfaceHandle) -> Result<(), PrintError> {
        let Some(path) = handle.path else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(sale_id = %handle.sale_id, "Spool file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Spool file already gone");
                Ok(())
            }
            Err(e) => Err(PrintError::Teardown(format!("{}: {}", path.display(), e))),
        }
    }
}
