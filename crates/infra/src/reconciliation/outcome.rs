use thiserror::Error;

use relo_core::{DomainError, InventoryId, JobId, Money};
use relo_inventory::SheetStatus;

use crate::store::StoreError;

/// A per-item stock write that did not land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWriteFailure {
    pub inventory_id: InventoryId,
    /// Net consumption change that still has to be applied.
    pub diff: i64,
    pub reason: StoreError,
}

/// Result of a save (or rededuct).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub job_id: JobId,
    pub status: SheetStatus,
    /// Items whose stock was actually written.
    pub applied: usize,
    /// Items whose stock write failed; their lines were persisted unchanged.
    pub failures: Vec<StockWriteFailure>,
    /// Total cost of the persisted sheet.
    pub total_cost: Money,
}

impl SaveOutcome {
    /// True when every planned stock write landed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub job_id: JobId,
    /// Items whose consumption was handed back to stock.
    pub reversed: usize,
    pub failures: Vec<StockWriteFailure>,
    /// Whether a sheet was stored for the job before the delete.
    pub existed: bool,
}

impl DeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Failure of a whole reconciliation operation.
///
/// Per-item stock failures are not errors; they are reported in the outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The candidate was rejected before any stock write.
    #[error("candidate rejected: {0}")]
    Validation(#[from] DomainError),

    /// The persisted sheet could not be read; nothing was applied.
    #[error("failed to read cost sheet: {0}")]
    SheetRead(StoreError),

    /// Persisting (or deleting) the sheet failed after `applied` stock writes had
    /// already landed. Those writes are not rolled back.
    #[error("failed to persist cost sheet after {applied} stock writes: {source}")]
    SheetPersist { source: StoreError, applied: usize },
}
