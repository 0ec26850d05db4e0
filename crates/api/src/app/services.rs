use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use relo_core::{InventoryId, JobId};
use relo_infra::{
    AppConfig, ReconciliationEngine, StockWriteMode,
    store::{
        CostSheetStore, InMemoryCostSheetStore, InMemoryInventoryStore, InventoryStore,
        PostgresCostSheetStore, PostgresInventoryStore, StoreError, ensure_schema,
    },
};
use relo_inventory::{CostSheetItem, InventoryItem};

use crate::app::dto::CostSheetLineRequest;

/// Engine over type-erased stores, so in-memory and Postgres wiring share a type.
pub type Engine = ReconciliationEngine<Arc<dyn CostSheetStore>, Arc<dyn InventoryStore>>;

/// Shared request-handling services.
pub struct AppServices {
    engine: Engine,
}

impl AppServices {
    pub fn new(
        sheets: Arc<dyn CostSheetStore>,
        inventory: Arc<dyn InventoryStore>,
        mode: StockWriteMode,
    ) -> Self {
        Self {
            engine: ReconciliationEngine::new(sheets, inventory).with_stock_write_mode(mode),
        }
    }

    /// In-memory wiring (dev/test) with a pre-populated catalog.
    pub fn in_memory(items: impl IntoIterator<Item = InventoryItem>, mode: StockWriteMode) -> Self {
        Self::new(
            Arc::new(InMemoryCostSheetStore::new()),
            Arc::new(InMemoryInventoryStore::with_items(items)),
            mode,
        )
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn sheets(&self) -> &Arc<dyn CostSheetStore> {
        self.engine.sheets()
    }

    pub fn inventory(&self) -> &Arc<dyn InventoryStore> {
        self.engine.inventory()
    }

    /// Turn request lines into cost sheet lines.
    ///
    /// Snapshot fields (code, description, unit, price) not given in the request
    /// come from the line already stored on the job's sheet, else from the current
    /// catalog entry. A line that can be resolved from neither is rejected.
    pub async fn resolve_lines(
        &self,
        job_id: &JobId,
        lines: Vec<CostSheetLineRequest>,
    ) -> Result<Vec<CostSheetItem>, ResolveError> {
        let stored = self.sheets().get_or_default(job_id).await?;
        let stored: HashMap<InventoryId, CostSheetItem> = stored
            .items
            .into_iter()
            .map(|i| (i.inventory_id, i))
            .collect();

        let missing: Vec<InventoryId> = lines
            .iter()
            .filter(|l| !l.is_complete() && !stored.contains_key(&l.inventory_id))
            .map(|l| l.inventory_id)
            .collect();
        let catalog: HashMap<InventoryId, InventoryItem> = self
            .inventory()
            .get_many(&missing)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        lines
            .into_iter()
            .map(|line| {
                let base = stored
                    .get(&line.inventory_id)
                    .cloned()
                    .or_else(|| catalog.get(&line.inventory_id).map(CostSheetItem::snapshot));
                let id = line.inventory_id;
                line.into_item(base).ok_or(ResolveError::UnknownItem(id))
            })
            .collect()
    }
}

/// Why request lines could not be turned into cost sheet lines.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("inventory item {0} is not in the catalog")]
    UnknownItem(InventoryId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Select stores from configuration: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let Some(url) = config.database_url.as_deref() else {
        return Ok(AppServices::in_memory([], config.stock_write_mode));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    ensure_schema(&pool)
        .await
        .context("failed to create schema")?;

    Ok(AppServices::new(
        Arc::new(PostgresCostSheetStore::new(pool.clone())),
        Arc::new(PostgresInventoryStore::new(pool)),
        config.stock_write_mode,
    ))
}
