//! Postgres-backed stores.
//!
//! ## Tables
//!
//! - `inventory_items`: one row per catalog item; `stock` is a signed `BIGINT`.
//! - `job_cost_sheets`: one row per job (`job_id` primary key, so upsert-by-key
//!   enforces one sheet per job); lines are stored as a JSONB array.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database / Io / PoolTimedOut / PoolClosed / other | `Unavailable` |
//! | ColumnDecode / Decode / JSON payload errors | `Serialization` |
//! | zero rows affected by a stock write | `NotFound` |
//!
//! ## Thread Safety
//!
//! Both stores are `Send + Sync` and share a SQLx connection pool.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use relo_core::{InventoryId, JobId, Money};
use relo_inventory::{CostSheetItem, InventoryItem, JobCostSheet, SheetStatus};

use super::r#trait::{CostSheetStore, InventoryStore, StoreError};

/// Create the tables used by the Postgres stores if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory_items (
            id             BIGINT PRIMARY KEY,
            code           TEXT NOT NULL,
            description    TEXT NOT NULL DEFAULT '',
            unit           TEXT NOT NULL DEFAULT '',
            price_cents    BIGINT NOT NULL DEFAULT 0,
            stock          BIGINT NOT NULL DEFAULT 0,
            critical_stock BIGINT NOT NULL DEFAULT 0,
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("ensure_schema", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_cost_sheets (
            job_id           TEXT PRIMARY KEY,
            items            JSONB NOT NULL DEFAULT '[]'::jsonb,
            status           TEXT NOT NULL,
            total_cost_cents BIGINT NOT NULL DEFAULT 0,
            updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("ensure_schema", e))?;

    Ok(())
}

/// Postgres-backed cost sheet store (`job_cost_sheets` table).
#[derive(Debug, Clone)]
pub struct PostgresCostSheetStore {
    pool: Arc<PgPool>,
}

impl PostgresCostSheetStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn sheet_from_row(row: &PgRow) -> Result<JobCostSheet, StoreError> {
    let job_id: String = row
        .try_get("job_id")
        .map_err(|e| map_sqlx_error("decode job_id", e))?;
    let items: serde_json::Value = row
        .try_get("items")
        .map_err(|e| map_sqlx_error("decode items", e))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| map_sqlx_error("decode status", e))?;
    let total_cost_cents: i64 = row
        .try_get("total_cost_cents")
        .map_err(|e| map_sqlx_error("decode total_cost_cents", e))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| map_sqlx_error("decode updated_at", e))?;

    let job_id = JobId::new(job_id).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let items: Vec<CostSheetItem> = serde_json::from_value(items)
        .map_err(|e| StoreError::Serialization(format!("cost sheet items for {job_id}: {e}")))?;
    let status = SheetStatus::parse(&status)
        .ok_or_else(|| StoreError::Serialization(format!("unknown sheet status {status:?}")))?;

    Ok(JobCostSheet {
        job_id,
        items,
        status,
        total_cost: Money::from_cents(total_cost_cents),
        updated_at,
    })
}

#[async_trait::async_trait]
impl CostSheetStore for PostgresCostSheetStore {
    #[instrument(skip(self), fields(job_id = %job_id), err)]
    async fn get(&self, job_id: &JobId) -> Result<Option<JobCostSheet>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT job_id, items, status, total_cost_cents, updated_at
            FROM job_cost_sheets
            WHERE job_id = $1
            "#,
        )
        .bind(job_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_cost_sheet", e))?;

        row.as_ref().map(sheet_from_row).transpose()
    }

    #[instrument(skip(self, sheet), fields(job_id = %sheet.job_id), err)]
    async fn upsert(&self, sheet: &JobCostSheet) -> Result<(), StoreError> {
        let items = serde_json::to_value(&sheet.items)
            .map_err(|e| StoreError::Serialization(format!("cost sheet items: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO job_cost_sheets (job_id, items, status, total_cost_cents, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id)
            DO UPDATE SET
                items = EXCLUDED.items,
                status = EXCLUDED.status,
                total_cost_cents = EXCLUDED.total_cost_cents,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(sheet.job_id.as_str())
        .bind(items)
        .bind(sheet.status.as_str())
        .bind(sheet.total_cost.cents())
        .bind(sheet.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_cost_sheet", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %job_id), err)]
    async fn delete(&self, job_id: &JobId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM job_cost_sheets WHERE job_id = $1")
            .bind(job_id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cost_sheet", e))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<JobCostSheet>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT job_id, items, status, total_cost_cents, updated_at
            FROM job_cost_sheets
            ORDER BY updated_at DESC, job_id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_cost_sheets", e))?;

        rows.iter().map(sheet_from_row).collect()
    }
}

/// Postgres-backed inventory master store (`inventory_items` table).
///
/// `set_stock` writes an absolute value (last writer wins); `adjust_stock` is a
/// single `UPDATE ... SET stock = stock + $delta`, so concurrent adjustments to the
/// same row serialize on the row lock instead of overwriting each other.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, StoreError> {
    let decode = |e| map_sqlx_error("decode inventory item", e);
    Ok(InventoryItem {
        id: InventoryId::new(row.try_get("id").map_err(decode)?),
        code: row.try_get("code").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        unit: row.try_get("unit").map_err(decode)?,
        price: Money::from_cents(row.try_get("price_cents").map_err(decode)?),
        stock: row.try_get("stock").map_err(decode)?,
        critical_stock: row.try_get("critical_stock").map_err(decode)?,
    })
}

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), fields(inventory_id = %id), err)]
    async fn get(&self, id: InventoryId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, code, description, unit, price_cents, stock, critical_stock
            FROM inventory_items
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn get_many(&self, ids: &[InventoryId]) -> Result<Vec<InventoryItem>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, code, description, unit, price_cents, stock, critical_stock
            FROM inventory_items
            WHERE id = ANY($1)
            "#,
        )
        .bind(raw)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_many_inventory_items", e))?;

        let mut by_id: HashMap<InventoryId, InventoryItem> = rows
            .iter()
            .map(|r| item_from_row(r).map(|i| (i.id, i)))
            .collect::<Result<_, _>>()?;

        // Same order as requested.
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, description, unit, price_cents, stock, critical_stock
            FROM inventory_items
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self), fields(inventory_id = %id), err)]
    async fn set_stock(&self, id: InventoryId, stock: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE inventory_items SET stock = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.get())
        .bind(stock)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("inventory item {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(inventory_id = %id), err)]
    async fn adjust_stock(&self, id: InventoryId, delta: i64) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE inventory_items
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock
            "#,
        )
        .bind(id.get())
        .bind(delta)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        match row {
            Some(row) => row
                .try_get::<i64, _>("stock")
                .map_err(|e| map_sqlx_error("decode stock", e)),
            None => Err(StoreError::NotFound(format!("inventory item {id}"))),
        }
    }

    #[instrument(skip(self, item), fields(inventory_id = %item.id), err)]
    async fn upsert_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, code, description, unit, price_cents, stock, critical_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id)
            DO UPDATE SET
                code = EXCLUDED.code,
                description = EXCLUDED.description,
                unit = EXCLUDED.unit,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                critical_stock = EXCLUDED.critical_stock,
                updated_at = NOW()
            "#,
        )
        .bind(item.id.get())
        .bind(&item.code)
        .bind(&item.description)
        .bind(&item.unit)
        .bind(item.price.cents())
        .bind(item.stock)
        .bind(item.critical_stock)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_inventory_item", e))?;

        Ok(())
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Serialization(format!("decode error in {operation}: {err}"))
        }
        sqlx::Error::Database(db_err) => {
            StoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}
