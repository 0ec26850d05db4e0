use std::collections::HashMap;
use std::sync::RwLock;

use relo_core::{InventoryId, JobId};
use relo_inventory::{InventoryItem, JobCostSheet};

use super::r#trait::{CostSheetStore, InventoryStore, StoreError};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory cost sheet store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCostSheetStore {
    sheets: RwLock<HashMap<JobId, JobCostSheet>>,
}

impl InMemoryCostSheetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CostSheetStore for InMemoryCostSheetStore {
    async fn get(&self, job_id: &JobId) -> Result<Option<JobCostSheet>, StoreError> {
        let sheets = self.sheets.read().map_err(|_| poisoned())?;
        Ok(sheets.get(job_id).cloned())
    }

    async fn upsert(&self, sheet: &JobCostSheet) -> Result<(), StoreError> {
        let mut sheets = self.sheets.write().map_err(|_| poisoned())?;
        sheets.insert(sheet.job_id.clone(), sheet.clone());
        Ok(())
    }

    async fn delete(&self, job_id: &JobId) -> Result<(), StoreError> {
        let mut sheets = self.sheets.write().map_err(|_| poisoned())?;
        sheets.remove(job_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<JobCostSheet>, StoreError> {
        let sheets = self.sheets.read().map_err(|_| poisoned())?;
        let mut all: Vec<JobCostSheet> = sheets.values().cloned().collect();
        all.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(all)
    }
}

/// In-memory inventory master store.
///
/// Intended for tests/dev. `adjust_stock` runs under the write lock, so it is
/// atomic per item; `get` followed by `set_stock` is not.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    items: RwLock<HashMap<InventoryId, InventoryItem>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with catalog items.
    pub fn with_items(items: impl IntoIterator<Item = InventoryItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|i| (i.id, i)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get(&self, id: InventoryId) -> Result<Option<InventoryItem>, StoreError> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(items.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[InventoryId]) -> Result<Vec<InventoryItem>, StoreError> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let items = self.items.read().map_err(|_| poisoned())?;
        let mut all: Vec<InventoryItem> = items.values().cloned().collect();
        all.sort_by_key(|i| i.id);
        Ok(all)
    }

    async fn set_stock(&self, id: InventoryId, stock: i64) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {id}")))?;
        item.stock = stock;
        Ok(())
    }

    async fn adjust_stock(&self, id: InventoryId, delta: i64) -> Result<i64, StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {id}")))?;
        item.stock = item.stock.saturating_add(delta);
        Ok(item.stock)
    }

    async fn upsert_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        items.insert(item.id, item.clone());
        Ok(())
    }
}
