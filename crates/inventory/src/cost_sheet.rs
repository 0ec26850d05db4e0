//! Job material cost sheets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relo_core::{Entity, InventoryId, JobId, Money, ValueObject};

use crate::item::InventoryItem;

/// One material line on a job's cost sheet.
///
/// Price, code, description and unit are a snapshot taken when the line was added;
/// they are not refreshed from the catalog so historical job cost stays stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSheetItem {
    pub inventory_id: InventoryId,
    pub code: String,
    pub description: String,
    pub unit: String,
    pub price: Money,
    pub issued_qty: u32,
    pub returned_qty: u32,
}

impl ValueObject for CostSheetItem {}

impl CostSheetItem {
    /// Start a new line from the current catalog entry.
    pub fn snapshot(item: &InventoryItem) -> Self {
        Self {
            inventory_id: item.id,
            code: item.code.clone(),
            description: item.description.clone(),
            unit: item.unit.clone(),
            price: item.price,
            issued_qty: 0,
            returned_qty: 0,
        }
    }

    pub fn with_issued(mut self, qty: u32) -> Self {
        self.issued_qty = qty;
        self
    }

    pub fn with_returned(mut self, qty: u32) -> Self {
        self.returned_qty = qty;
        self
    }

    /// Net consumption (`issued - returned`). Unclamped: may be negative.
    pub fn net_consumption(&self) -> i64 {
        i64::from(self.issued_qty) - i64::from(self.returned_qty)
    }

    /// Units billed on this line (`max(0, issued - returned)`).
    pub fn billable_units(&self) -> u64 {
        self.net_consumption().max(0).unsigned_abs()
    }

    pub fn line_cost(&self) -> Money {
        self.price.times(self.billable_units())
    }
}

/// Stage the operator is working in when saving a sheet.
///
/// Stages are ordered: a sheet moves from `Issued` to `Returned` to `Finalized`
/// and never back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStage {
    /// Materials going out to the job; `issued_qty` is editable.
    Issued,
    /// Materials coming back; `returned_qty` is editable.
    Returned,
    /// Sheet closed; no quantity is editable.
    Finalized,
}

/// Persisted status of a cost sheet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    Issued,
    Returned,
    Finalized,
}

impl SheetStage {
    pub fn status(self) -> SheetStatus {
        match self {
            SheetStage::Issued => SheetStatus::Issued,
            SheetStage::Returned => SheetStatus::Returned,
            SheetStage::Finalized => SheetStatus::Finalized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SheetStage::Issued => "issued",
            SheetStage::Returned => "returned",
            SheetStage::Finalized => "finalized",
        }
    }
}

impl SheetStatus {
    /// The stage a sheet with this status was last saved in.
    pub fn stage(self) -> SheetStage {
        match self {
            SheetStatus::Issued => SheetStage::Issued,
            SheetStatus::Returned => SheetStage::Returned,
            SheetStatus::Finalized => SheetStage::Finalized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SheetStatus::Issued => "issued",
            SheetStatus::Returned => "returned",
            SheetStatus::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issued" => Some(SheetStatus::Issued),
            "returned" => Some(SheetStatus::Returned),
            "finalized" => Some(SheetStatus::Finalized),
            _ => None,
        }
    }
}

/// Sum of line costs: `Σ max(0, issued - returned) × price`.
pub fn total_cost(items: &[CostSheetItem]) -> Money {
    items.iter().map(CostSheetItem::line_cost).sum()
}

/// The one cost sheet of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCostSheet {
    pub job_id: JobId,
    pub items: Vec<CostSheetItem>,
    pub status: SheetStatus,
    /// Cached at save time; [`JobCostSheet::recomputed_total`] is authoritative.
    pub total_cost: Money,
    pub updated_at: DateTime<Utc>,
}

impl JobCostSheet {
    /// The sheet a job has before its first save: no lines, nothing consumed.
    pub fn empty(job_id: JobId) -> Self {
        Self {
            job_id,
            items: Vec::new(),
            status: SheetStatus::Issued,
            total_cost: Money::ZERO,
            updated_at: DateTime::<Utc>::default(),
        }
    }

    /// Build the sheet to persist for a save.
    pub fn from_candidate(
        job_id: JobId,
        items: Vec<CostSheetItem>,
        stage: SheetStage,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let total_cost = total_cost(&items);
        Self {
            job_id,
            items,
            status: stage.status(),
            total_cost,
            updated_at,
        }
    }

    pub fn item(&self, inventory_id: InventoryId) -> Option<&CostSheetItem> {
        self.items.iter().find(|i| i.inventory_id == inventory_id)
    }

    pub fn recomputed_total(&self) -> Money {
        total_cost(&self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Entity for JobCostSheet {
    type Id = JobId;

    fn id(&self) -> &Self::Id {
        &self.job_id
    }
}
