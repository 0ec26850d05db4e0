//! HTTP API: the calls the operations dashboard makes into the reconciliation
//! engine, plus read-only catalog and cost sheet views.

pub mod app;
