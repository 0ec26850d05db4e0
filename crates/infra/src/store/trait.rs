use std::sync::Arc;

use thiserror::Error;

use relo_core::{InventoryId, JobId};
use relo_inventory::{InventoryItem, JobCostSheet};

/// Store operation error.
///
/// These are **infrastructure errors** (I/O, missing rows, payload decoding) as
/// opposed to domain errors (validation, stage locks).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or the call failed mid-flight.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write targeted a row that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored payload could not be encoded/decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Cost sheet persistence: one sheet per job, keyed by job identifier.
#[async_trait::async_trait]
pub trait CostSheetStore: Send + Sync {
    /// Load the sheet for a job, or `None` if the job has never been saved.
    async fn get(&self, job_id: &JobId) -> Result<Option<JobCostSheet>, StoreError>;

    /// Insert or replace the sheet keyed by `sheet.job_id`.
    async fn upsert(&self, sheet: &JobCostSheet) -> Result<(), StoreError>;

    /// Remove the sheet for a job. Removing an absent sheet is not an error.
    async fn delete(&self, job_id: &JobId) -> Result<(), StoreError>;

    /// All sheets, most recently updated first.
    async fn list(&self) -> Result<Vec<JobCostSheet>, StoreError>;

    /// Load the sheet for a job, treating a never-saved job as an empty sheet.
    async fn get_or_default(&self, job_id: &JobId) -> Result<JobCostSheet, StoreError> {
        Ok(self
            .get(job_id)
            .await?
            .unwrap_or_else(|| JobCostSheet::empty(job_id.clone())))
    }
}

/// Inventory master (catalog) persistence.
///
/// Reconciliation only ever reads items and writes `stock`; `upsert_item` and
/// `list` serve catalog maintenance and display.
#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get(&self, id: InventoryId) -> Result<Option<InventoryItem>, StoreError>;

    /// Load several items; ids without a catalog row are omitted from the result.
    async fn get_many(&self, ids: &[InventoryId]) -> Result<Vec<InventoryItem>, StoreError>;

    /// All catalog items ordered by id.
    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError>;

    /// Overwrite `stock` with an absolute value.
    async fn set_stock(&self, id: InventoryId, stock: i64) -> Result<(), StoreError>;

    /// Add `delta` to `stock` in one store-side step and return the new value.
    async fn adjust_stock(&self, id: InventoryId, delta: i64) -> Result<i64, StoreError>;

    /// Insert or replace a catalog item.
    async fn upsert_item(&self, item: &InventoryItem) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S> CostSheetStore for Arc<S>
where
    S: CostSheetStore + ?Sized,
{
    async fn get(&self, job_id: &JobId) -> Result<Option<JobCostSheet>, StoreError> {
        (**self).get(job_id).await
    }

    async fn upsert(&self, sheet: &JobCostSheet) -> Result<(), StoreError> {
        (**self).upsert(sheet).await
    }

    async fn delete(&self, job_id: &JobId) -> Result<(), StoreError> {
        (**self).delete(job_id).await
    }

    async fn list(&self) -> Result<Vec<JobCostSheet>, StoreError> {
        (**self).list().await
    }
}

#[async_trait::async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn get(&self, id: InventoryId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).get(id).await
    }

    async fn get_many(&self, ids: &[InventoryId]) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).get_many(ids).await
    }

    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).list().await
    }

    async fn set_stock(&self, id: InventoryId, stock: i64) -> Result<(), StoreError> {
        (**self).set_stock(id, stock).await
    }

    async fn adjust_stock(&self, id: InventoryId, delta: i64) -> Result<i64, StoreError> {
        (**self).adjust_stock(id, delta).await
    }

    async fn upsert_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        (**self).upsert_item(item).await
    }
}
