//! Stock reconciliation planning.
//!
//! A save replaces a sheet's previous contribution to stock with the candidate's;
//! a delete removes it. Both reduce to a list of per-item diffs in net consumption,
//! applied to catalog stock as `stock - diff`. Planning is pure so the same inputs
//! always yield the same plan; that is what makes replaying a save safe.

use std::collections::BTreeMap;

use relo_core::InventoryId;

use crate::cost_sheet::CostSheetItem;

/// Change in net consumption for one catalog item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockDiff {
    pub inventory_id: InventoryId,
    /// Net consumption attributed before this operation (0 if the line was absent).
    pub old_net: i64,
    /// Net consumption attributed after this operation (0 if the line is gone).
    pub new_net: i64,
    /// `new_net - old_net`; never zero inside a plan.
    pub diff: i64,
}

impl StockDiff {
    /// Stock level after applying this diff to `stock`.
    pub fn apply_to(&self, stock: i64) -> i64 {
        stock.saturating_sub(self.diff)
    }

    /// Signed stock delta (`-diff`), for stores that adjust in place.
    pub fn stock_delta(&self) -> i64 {
        self.diff.saturating_neg()
    }
}

/// Ordered set of non-zero diffs, one per catalog item (ascending `inventory_id`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockPlan {
    diffs: Vec<StockDiff>,
}

impl StockPlan {
    pub fn diffs(&self) -> &[StockDiff] {
        &self.diffs
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn get(&self, inventory_id: InventoryId) -> Option<&StockDiff> {
        self.diffs.iter().find(|d| d.inventory_id == inventory_id)
    }

    fn from_nets(nets: BTreeMap<InventoryId, (i64, i64)>) -> Self {
        let diffs = nets
            .into_iter()
            .filter_map(|(inventory_id, (old_net, new_net))| {
                let diff = new_net - old_net;
                (diff != 0).then_some(StockDiff {
                    inventory_id,
                    old_net,
                    new_net,
                    diff,
                })
            })
            .collect();
        Self { diffs }
    }
}

/// Plan the stock movement for saving `candidate` over `previous`.
///
/// Covers the union of both item sets: lines dropped from the candidate give their
/// consumption back, new lines consume. Net consumption is not clamped, so an
/// over-returned line (`returned > issued`) raises stock past what it issued.
pub fn plan_save(previous: &[CostSheetItem], candidate: &[CostSheetItem]) -> StockPlan {
    let mut nets: BTreeMap<InventoryId, (i64, i64)> = BTreeMap::new();
    for item in previous {
        nets.entry(item.inventory_id).or_default().0 += item.net_consumption();
    }
    for item in candidate {
        nets.entry(item.inventory_id).or_default().1 += item.net_consumption();
    }
    StockPlan::from_nets(nets)
}

/// Plan the stock movement for deleting a sheet: every line's net consumption is
/// handed back, so applying the plan gives `stock + net` per item.
pub fn plan_reversal(previous: &[CostSheetItem]) -> StockPlan {
    plan_save(previous, &[])
}
