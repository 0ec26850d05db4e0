use std::collections::HashSet;
use std::str::FromStr;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use relo_core::{InventoryId, JobId};
use relo_inventory::{
    CostSheetItem, JobCostSheet, SheetStage, StockDiff, StockPlan, plan_reversal, plan_save,
    validate_candidate,
};

use super::outcome::{DeleteOutcome, ReconcileError, SaveOutcome, StockWriteFailure};
use crate::store::{CostSheetStore, InventoryStore, StoreError};

/// How a planned diff is written to catalog stock.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum StockWriteMode {
    /// Fresh read of `stock`, then `set_stock(stock - diff)`. A concurrent writer
    /// between the read and the write is overwritten (lost update).
    #[default]
    ReadModifyWrite,
    /// `adjust_stock(-diff)`, a single store-side increment per item.
    Atomic,
}

impl StockWriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StockWriteMode::ReadModifyWrite => "read_modify_write",
            StockWriteMode::Atomic => "atomic",
        }
    }
}

impl FromStr for StockWriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read_modify_write" | "rmw" => Ok(StockWriteMode::ReadModifyWrite),
            "atomic" => Ok(StockWriteMode::Atomic),
            other => Err(format!(
                "unknown stock write mode {other:?} (expected read_modify_write or atomic)"
            )),
        }
    }
}

/// Reconciles catalog stock with job cost sheets.
///
/// ## Operations
///
/// - [`save`](Self::save): diff the candidate against the last persisted sheet,
///   write each non-zero diff to stock, persist the sheet.
/// - [`delete`](Self::delete): hand every line's net consumption back to stock,
///   remove the sheet.
/// - [`rededuct`](Self::rededuct): a save with the operator's current sheet, used
///   to land writes an earlier save reported as failed.
///
/// ## Partial failure
///
/// Stock writes are per item and best-effort: a failed write is logged, reported
/// in the outcome, and the loop moves on. The persisted sheet only attributes
/// what landed (a failed line keeps its previously persisted quantities), so a
/// replay picks up exactly the missing deltas.
///
/// The batch is not transactional. If persisting the sheet itself fails, stock
/// writes that already landed stay in place and the error says how many.
///
/// ## Concurrency
///
/// Items are processed one at a time, in ascending id order. Nothing serializes
/// two operations running at once against the same item; in
/// [`StockWriteMode::ReadModifyWrite`] they can lose each other's updates.
#[derive(Debug)]
pub struct ReconciliationEngine<S, I> {
    sheets: S,
    inventory: I,
    mode: StockWriteMode,
}

impl<S, I> ReconciliationEngine<S, I>
where
    S: CostSheetStore,
    I: InventoryStore,
{
    pub fn new(sheets: S, inventory: I) -> Self {
        Self {
            sheets,
            inventory,
            mode: StockWriteMode::default(),
        }
    }

    pub fn with_stock_write_mode(mut self, mode: StockWriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn stock_write_mode(&self) -> StockWriteMode {
        self.mode
    }

    pub fn sheets(&self) -> &S {
        &self.sheets
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Save the full current line list for a job.
    #[instrument(
        skip(self, candidate),
        fields(job_id = %job_id, stage = stage.as_str(), lines = candidate.len())
    )]
    pub async fn save(
        &self,
        job_id: &JobId,
        candidate: Vec<CostSheetItem>,
        stage: SheetStage,
    ) -> Result<SaveOutcome, ReconcileError> {
        let previous = self
            .sheets
            .get_or_default(job_id)
            .await
            .map_err(ReconcileError::SheetRead)?;

        validate_candidate(&previous, &candidate, stage)?;

        let plan = plan_save(&previous.items, &candidate);
        let (applied, failures) = self.apply_plan(&plan).await;

        let failed: HashSet<InventoryId> = failures.iter().map(|f| f.inventory_id).collect();
        let items = landed_lines(&previous.items, candidate, &failed);
        let sheet = JobCostSheet::from_candidate(job_id.clone(), items, stage, Utc::now());

        if let Err(source) = self.sheets.upsert(&sheet).await {
            error!(applied, error = %source, "cost sheet upsert failed; applied stock writes kept");
            return Err(ReconcileError::SheetPersist { source, applied });
        }

        info!(
            applied,
            failed = failures.len(),
            total_cost = %sheet.total_cost,
            "cost sheet saved"
        );

        Ok(SaveOutcome {
            job_id: job_id.clone(),
            status: sheet.status,
            applied,
            failures,
            total_cost: sheet.total_cost,
        })
    }

    /// Replay a save with the operator's current sheet.
    ///
    /// Identical to [`save`](Self::save): after a fully successful save every diff
    /// is zero and nothing moves; after a partial one only the missing diffs apply.
    pub async fn rededuct(
        &self,
        job_id: &JobId,
        candidate: Vec<CostSheetItem>,
        stage: SheetStage,
    ) -> Result<SaveOutcome, ReconcileError> {
        self.save(job_id, candidate, stage).await
    }

    /// Delete a job's sheet, handing its consumption back to stock.
    ///
    /// Lines whose reversal failed stay on the stored sheet so a repeated delete
    /// can finish them; the row is removed only once nothing is left to reverse.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn delete(&self, job_id: &JobId) -> Result<DeleteOutcome, ReconcileError> {
        let previous = self
            .sheets
            .get(job_id)
            .await
            .map_err(ReconcileError::SheetRead)?;

        let existed = previous.is_some();
        let previous = previous.unwrap_or_else(|| JobCostSheet::empty(job_id.clone()));

        let plan = plan_reversal(&previous.items);
        let (reversed, failures) = self.apply_plan(&plan).await;

        let result = if failures.is_empty() {
            self.sheets.delete(job_id).await
        } else {
            let failed: HashSet<InventoryId> = failures.iter().map(|f| f.inventory_id).collect();
            let remaining: Vec<CostSheetItem> = previous
                .items
                .into_iter()
                .filter(|i| failed.contains(&i.inventory_id))
                .collect();
            let total_cost = relo_inventory::total_cost(&remaining);
            let sheet = JobCostSheet {
                job_id: job_id.clone(),
                items: remaining,
                status: previous.status,
                total_cost,
                updated_at: Utc::now(),
            };
            warn!(
                remaining = sheet.items.len(),
                "cost sheet kept with unreversed lines"
            );
            self.sheets.upsert(&sheet).await
        };

        if let Err(source) = result {
            error!(reversed, error = %source, "cost sheet delete failed; reversed stock writes kept");
            return Err(ReconcileError::SheetPersist {
                source,
                applied: reversed,
            });
        }

        info!(reversed, failed = failures.len(), existed, "cost sheet deleted");

        Ok(DeleteOutcome {
            job_id: job_id.clone(),
            reversed,
            failures,
            existed,
        })
    }

    /// Apply every diff in order; one item finishes before the next starts.
    async fn apply_plan(&self, plan: &StockPlan) -> (usize, Vec<StockWriteFailure>) {
        let mut applied = 0;
        let mut failures = Vec::new();

        for diff in plan.diffs() {
            match self.write_stock(diff).await {
                Ok(stock) => {
                    debug!(
                        inventory_id = %diff.inventory_id,
                        diff = diff.diff,
                        stock,
                        "stock updated"
                    );
                    applied += 1;
                }
                Err(reason) => {
                    warn!(
                        inventory_id = %diff.inventory_id,
                        diff = diff.diff,
                        error = %reason,
                        "stock write failed; continuing"
                    );
                    failures.push(StockWriteFailure {
                        inventory_id: diff.inventory_id,
                        diff: diff.diff,
                        reason,
                    });
                }
            }
        }

        (applied, failures)
    }

    async fn write_stock(&self, diff: &StockDiff) -> Result<i64, StoreError> {
        match self.mode {
            StockWriteMode::ReadModifyWrite => {
                let item = self
                    .inventory
                    .get(diff.inventory_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("inventory item {}", diff.inventory_id)))?;
                let stock = diff.apply_to(item.stock);
                self.inventory.set_stock(diff.inventory_id, stock).await?;
                Ok(stock)
            }
            StockWriteMode::Atomic => {
                self.inventory
                    .adjust_stock(diff.inventory_id, diff.stock_delta())
                    .await
            }
        }
    }
}

/// Lines to persist: the candidate, except that items whose stock write failed
/// keep their previously persisted line (or stay absent).
fn landed_lines(
    previous: &[CostSheetItem],
    candidate: Vec<CostSheetItem>,
    failed: &HashSet<InventoryId>,
) -> Vec<CostSheetItem> {
    if failed.is_empty() {
        return candidate;
    }

    let mut lines: Vec<CostSheetItem> = candidate
        .into_iter()
        .filter(|c| !failed.contains(&c.inventory_id))
        .collect();
    lines.extend(
        previous
            .iter()
            .filter(|p| failed.contains(&p.inventory_id))
            .cloned(),
    );
    lines
}
