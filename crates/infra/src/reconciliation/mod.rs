//! Inventory consumption reconciliation.
//!
//! Keeps catalog stock consistent with the job cost sheets that consume it:
//! a save replaces the sheet's previous contribution, a delete removes it, and a
//! rededuct replays a save to land deltas an earlier save could not write.

pub mod engine;
pub mod outcome;

pub use engine::{ReconciliationEngine, StockWriteMode};
pub use outcome::{DeleteOutcome, ReconcileError, SaveOutcome, StockWriteFailure};
