//! Infrastructure layer: stores, reconciliation engine, configuration.

pub mod config;
pub mod reconciliation;
pub mod store;

mod integration_tests;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use reconciliation::{
    DeleteOutcome, ReconcileError, ReconciliationEngine, SaveOutcome, StockWriteFailure,
    StockWriteMode,
};
