//! Candidate sheet checks run before any stock is touched.

use std::collections::{HashMap, HashSet};

use relo_core::{DomainError, DomainResult, InventoryId, Money};

use crate::cost_sheet::{CostSheetItem, JobCostSheet, SheetStage};

/// Validate a candidate line list against the last persisted sheet.
///
/// - at most one line per catalog item, priced at zero or more;
/// - `stage` is not earlier than the stage the sheet was persisted in;
/// - only the quantity owned by `stage` may differ from the persisted sheet
///   (`Issued` edits `issued_qty`, `Returned` edits `returned_qty`, `Finalized`
///   edits neither). A line missing on either side counts as zero quantities.
pub fn validate_candidate(
    previous: &JobCostSheet,
    candidate: &[CostSheetItem],
    stage: SheetStage,
) -> DomainResult<()> {
    let mut seen = HashSet::with_capacity(candidate.len());
    for item in candidate {
        if !seen.insert(item.inventory_id) {
            return Err(DomainError::validation(format!(
                "inventory item {} appears more than once",
                item.inventory_id
            )));
        }
        if item.price < Money::ZERO {
            return Err(DomainError::validation(format!(
                "price of inventory item {} cannot be negative",
                item.inventory_id
            )));
        }
    }

    let persisted = previous.status.stage();
    if stage < persisted {
        return Err(DomainError::conflict(format!(
            "sheet of job {} is {} and cannot go back to {}",
            previous.job_id,
            persisted.as_str(),
            stage.as_str()
        )));
    }

    let before: HashMap<InventoryId, (u32, u32)> = previous
        .items
        .iter()
        .map(|i| (i.inventory_id, (i.issued_qty, i.returned_qty)))
        .collect();
    let after: HashMap<InventoryId, (u32, u32)> = candidate
        .iter()
        .map(|i| (i.inventory_id, (i.issued_qty, i.returned_qty)))
        .collect();

    let mut ids: Vec<InventoryId> = before.keys().chain(after.keys()).copied().collect();
    ids.sort();
    ids.dedup();

    for id in ids {
        let (old_issued, old_returned) = before.get(&id).copied().unwrap_or_default();
        let (new_issued, new_returned) = after.get(&id).copied().unwrap_or_default();

        let issued_changed = old_issued != new_issued;
        let returned_changed = old_returned != new_returned;

        let locked = match stage {
            SheetStage::Issued if returned_changed => Some("returned quantity"),
            SheetStage::Returned if issued_changed => Some("issued quantity"),
            SheetStage::Finalized if issued_changed || returned_changed => Some("quantities"),
            _ => None,
        };

        if let Some(field) = locked {
            return Err(DomainError::conflict(format!(
                "{field} of inventory item {id} cannot change in stage {}",
                stage.as_str()
            )));
        }
    }

    Ok(())
}
