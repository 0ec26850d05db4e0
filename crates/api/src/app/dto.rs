use serde::Deserialize;
use serde_json::{Value, json};

use relo_core::{InventoryId, Money};
use relo_infra::{DeleteOutcome, SaveOutcome, StockWriteFailure};
use relo_inventory::{CostSheetItem, InventoryItem, JobCostSheet, SheetStage};

// -------------------------
// Request DTOs
// -------------------------

/// Body of a save or rededuct: the job's full current sheet, not a delta.
#[derive(Debug, Deserialize)]
pub struct SaveCostSheetRequest {
    pub stage: SheetStage,
    #[serde(default)]
    pub items: Vec<CostSheetLineRequest>,
}

/// One requested line. Snapshot fields are optional; see `AppServices::resolve_lines`.
#[derive(Debug, Clone, Deserialize)]
pub struct CostSheetLineRequest {
    pub inventory_id: InventoryId,
    #[serde(default)]
    pub issued_qty: u32,
    #[serde(default)]
    pub returned_qty: u32,
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// Price in cents.
    pub price: Option<Money>,
}

impl CostSheetLineRequest {
    /// True when the request carries a full snapshot and needs no lookup.
    pub fn is_complete(&self) -> bool {
        self.code.is_some() && self.description.is_some() && self.unit.is_some() && self.price.is_some()
    }

    /// Build the line, taking missing snapshot fields from `base`.
    pub fn into_item(self, base: Option<CostSheetItem>) -> Option<CostSheetItem> {
        let item = match (self.is_complete(), base) {
            (true, _) => CostSheetItem {
                inventory_id: self.inventory_id,
                code: self.code.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
                unit: self.unit.unwrap_or_default(),
                price: self.price.unwrap_or_default(),
                issued_qty: self.issued_qty,
                returned_qty: self.returned_qty,
            },
            (false, Some(base)) => CostSheetItem {
                inventory_id: self.inventory_id,
                code: self.code.unwrap_or(base.code),
                description: self.description.unwrap_or(base.description),
                unit: self.unit.unwrap_or(base.unit),
                price: self.price.unwrap_or(base.price),
                issued_qty: self.issued_qty,
                returned_qty: self.returned_qty,
            },
            (false, None) => return None,
        };
        Some(item)
    }
}

/// Body of a catalog add/edit. The id comes from the path.
#[derive(Debug, Deserialize)]
pub struct UpsertInventoryItemRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    /// Price in cents.
    pub price: Money,
    /// Overrides stock when given; otherwise an edit keeps the current stock
    /// and a new item starts at zero.
    pub stock: Option<i64>,
    #[serde(default)]
    pub critical_stock: i64,
}

impl UpsertInventoryItemRequest {
    pub fn into_item(self, id: InventoryId, current_stock: Option<i64>) -> InventoryItem {
        let stock = self.stock.or(current_stock).unwrap_or(0);
        InventoryItem::new(id, self.code, self.price, stock)
            .with_description(self.description)
            .with_unit(self.unit)
            .with_critical_stock(self.critical_stock)
    }
}

// -------------------------
// Response mapping
// -------------------------

fn money_to_json(m: Money) -> Value {
    json!({ "cents": m.cents(), "display": m.to_string() })
}

pub fn inventory_to_json(item: &InventoryItem) -> Value {
    json!({
        "id": item.id,
        "code": item.code,
        "description": item.description,
        "unit": item.unit,
        "price": money_to_json(item.price),
        "stock": item.stock,
        "critical_stock": item.critical_stock,
        "low_stock": item.is_low_stock(),
    })
}

fn line_to_json(line: &CostSheetItem) -> Value {
    json!({
        "inventory_id": line.inventory_id,
        "code": line.code,
        "description": line.description,
        "unit": line.unit,
        "price": money_to_json(line.price),
        "issued_qty": line.issued_qty,
        "returned_qty": line.returned_qty,
        "net_consumption": line.net_consumption(),
        "line_cost": money_to_json(line.line_cost()),
    })
}

/// Sheet view. `total_cost` is recomputed from the lines; the stored cache is not
/// trusted for display.
pub fn sheet_to_json(sheet: &JobCostSheet, persisted: bool) -> Value {
    json!({
        "job_id": sheet.job_id,
        "status": sheet.status.as_str(),
        "persisted": persisted,
        "items": sheet.items.iter().map(line_to_json).collect::<Vec<_>>(),
        "total_cost": money_to_json(sheet.recomputed_total()),
        "updated_at": persisted.then(|| sheet.updated_at.to_rfc3339()),
    })
}

fn failure_to_json(f: &StockWriteFailure) -> Value {
    json!({
        "inventory_id": f.inventory_id,
        "diff": f.diff,
        "reason": f.reason.to_string(),
    })
}

pub fn save_outcome_to_json(out: &SaveOutcome) -> Value {
    json!({
        "job_id": out.job_id,
        "status": out.status.as_str(),
        "applied": out.applied,
        "complete": out.is_complete(),
        "failures": out.failures.iter().map(failure_to_json).collect::<Vec<_>>(),
        "total_cost": money_to_json(out.total_cost),
    })
}

pub fn delete_outcome_to_json(out: &DeleteOutcome) -> Value {
    json!({
        "job_id": out.job_id,
        "existed": out.existed,
        "reversed": out.reversed,
        "complete": out.is_complete(),
        "failures": out.failures.iter().map(failure_to_json).collect::<Vec<_>>(),
    })
}
