use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use relo_core::JobId;
use relo_inventory::JobCostSheet;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route(
            "/:job_id/cost-sheet",
            get(get_sheet).put(save_sheet).delete(delete_sheet),
        )
        .route("/:job_id/cost-sheet/rededuct", post(rededuct_sheet))
}

fn parse_job_id(raw: &str) -> Result<JobId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"))
}

pub async fn list_sheets(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.sheets().list().await {
        Ok(sheets) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": sheets.len(),
                "sheets": sheets.iter().map(|s| dto::sheet_to_json(s, true)).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// A job that was never saved reads as an empty, unpersisted sheet.
pub async fn get_sheet(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.sheets().get(&job_id).await {
        Ok(Some(sheet)) => (StatusCode::OK, Json(dto::sheet_to_json(&sheet, true))).into_response(),
        Ok(None) => (
            StatusCode::OK,
            Json(dto::sheet_to_json(&JobCostSheet::empty(job_id), false)),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn save_sheet(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
    Json(body): Json<dto::SaveCostSheetRequest>,
) -> axum::response::Response {
    save_or_rededuct(services, job_id, body, false).await
}

pub async fn rededuct_sheet(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
    Json(body): Json<dto::SaveCostSheetRequest>,
) -> axum::response::Response {
    save_or_rededuct(services, job_id, body, true).await
}

async fn save_or_rededuct(
    services: Arc<AppServices>,
    job_id: String,
    body: dto::SaveCostSheetRequest,
    rededuct: bool,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let items = match services.resolve_lines(&job_id, body.items).await {
        Ok(items) => items,
        Err(e) => return errors::resolve_error_to_response(e),
    };

    let result = if rededuct {
        services.engine().rededuct(&job_id, items, body.stage).await
    } else {
        services.engine().save(&job_id, items, body.stage).await
    };

    match result {
        Ok(out) => (StatusCode::OK, Json(dto::save_outcome_to_json(&out))).into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

pub async fn delete_sheet(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine().delete(&job_id).await {
        Ok(out) => (StatusCode::OK, Json(dto::delete_outcome_to_json(&out))).into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}
