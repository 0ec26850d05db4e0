//! Inventory consumption domain.
//!
//! Catalog items, job cost sheets, and the pure planning logic that decides how a
//! cost sheet save or delete moves catalog stock. Everything here is deterministic
//! domain logic (no IO, no HTTP, no storage); applying a plan is the infra layer's job.

pub mod cost_sheet;
pub mod item;
pub mod plan;
pub mod validation;

pub use cost_sheet::{CostSheetItem, JobCostSheet, SheetStage, SheetStatus, total_cost};
pub use item::InventoryItem;
pub use plan::{StockDiff, StockPlan, plan_reversal, plan_save};
pub use validation::validate_candidate;
