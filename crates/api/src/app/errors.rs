use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use relo_core::DomainError;
use relo_infra::{ReconcileError, store::StoreError};

use crate::app::services::ResolveError;

pub fn reconcile_error_to_response(err: ReconcileError) -> axum::response::Response {
    match err {
        ReconcileError::Validation(DomainError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "stage_locked", msg)
        }
        ReconcileError::Validation(e) => domain_error_to_response(e),
        ReconcileError::SheetRead(e) => store_error_to_response(e),
        ReconcileError::SheetPersist { source, applied } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({
                "error": "sheet_persist_failed",
                "message": source.to_string(),
                "applied": applied,
            })),
        )
            .into_response(),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        other => json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", other.to_string()),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        StoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        StoreError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
    }
}

pub fn resolve_error_to_response(err: ResolveError) -> axum::response::Response {
    match err {
        ResolveError::UnknownItem(_) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "unknown_inventory_item",
            err.to_string(),
        ),
        ResolveError::Store(e) => store_error_to_response(e),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
