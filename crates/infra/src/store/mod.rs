//! Store boundary for the reconciliation engine.
//!
//! Two contracts: the cost sheet store (one record per job) and the inventory
//! master store (catalog items whose `stock` the engine moves). Both are async and
//! make no storage assumptions; in-memory implementations back tests/dev and the
//! Postgres implementations back production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryCostSheetStore, InMemoryInventoryStore};
pub use postgres::{PostgresCostSheetStore, PostgresInventoryStore, ensure_schema};
pub use r#trait::{CostSheetStore, InventoryStore, StoreError};
