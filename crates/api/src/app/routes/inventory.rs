use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use relo_core::InventoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items))
        .route("/:id", get(get_item).put(upsert_item))
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory().list().await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": items.len(),
                "items": items.iter().map(dto::inventory_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: InventoryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid inventory id"),
    };

    match services.inventory().get(id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(dto::inventory_to_json(&item))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Catalog add/edit. Stock is only overwritten when the body sets it.
pub async fn upsert_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpsertInventoryItemRequest>,
) -> axum::response::Response {
    let id: InventoryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid inventory id"),
    };

    let current = match services.inventory().get(id).await {
        Ok(found) => found,
        Err(e) => return errors::store_error_to_response(e),
    };
    let existed = current.is_some();

    let item = body.into_item(id, current.map(|c| c.stock));
    if let Err(e) = item.validate() {
        return errors::domain_error_to_response(e);
    }

    if let Err(e) = services.inventory().upsert_item(&item).await {
        return errors::store_error_to_response(e);
    }

    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    (status, Json(dto::inventory_to_json(&item))).into_response()
}
