//! Box consolidation endpoints

use axum::routing::{delete, get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{BoxCreate, BoxDetail, BoxItemsAdd, BoxStatus, ShippingBox};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::boxes::BoxFilter;
use crate::state::AppState;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/boxes", get(list_boxes).post(create_box))
        .route("/api/boxes/{id}", get(get_box).delete(delete_box))
        .route("/api/boxes/{id}/items", post(add_items))
        .route("/api/boxes/{id}/items/{package_id}", delete(remove_item))
        .route("/api/boxes/{id}/recalculate", post(recalculate_weight))
        .route("/api/boxes/{id}/close", post(close_box))
        .route("/api/boxes/{id}/reopen", post(reopen_box))
}

#[derive(Debug, Default, Deserialize)]
pub struct BoxListQuery {
    pub client_id: Option<i64>,
    pub status: Option<BoxStatus>,
    pub shipment_id: Option<i64>,
    #[serde(default)]
    pub unassigned: bool,
    pub limit: Option<i64>,
}

/// GET /api/boxes
pub async fn list_boxes(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<BoxListQuery>,
) -> ApiResult<Vec<ShippingBox>> {
    let filter = BoxFilter {
        client_id: query.client_id,
        status: query.status,
        shipment_id: query.shipment_id,
        unassigned: query.unassigned,
        limit: db::clamp_limit(query.limit),
    };
    let boxes = db::boxes::list(&state.pool, current.scope, &filter).await?;
    Ok(Json(boxes))
}

/// POST /api/boxes
pub async fn create_box(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<BoxCreate>,
) -> ApiResult<ShippingBox> {
    current.require_staff()?;
    let created = db::boxes::create(&state.pool, &req).await?;
    Ok(Json(created))
}

/// GET /api/boxes/{id}
pub async fn get_box(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<BoxDetail> {
    let detail = db::boxes::detail(&state.pool, id).await?;
    let client = db::clients::get(&state.pool, detail.shipping_box.client_id).await?;
    current.ensure_client_visible(&client)?;
    Ok(Json(detail))
}

/// POST /api/boxes/{id}/items
pub async fn add_items(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<BoxItemsAdd>,
) -> ApiResult<BoxDetail> {
    current.require_staff()?;
    let detail = db::boxes::add_items(&state.pool, id, &req.package_ids).await?;
    Ok(Json(detail))
}

/// DELETE /api/boxes/{id}/items/{package_id}
pub async fn remove_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, package_id)): Path<(i64, i64)>,
) -> ApiResult<BoxDetail> {
    current.require_staff()?;
    let detail = db::boxes::remove_item(&state.pool, id, package_id).await?;
    Ok(Json(detail))
}

/// POST /api/boxes/{id}/recalculate
pub async fn recalculate_weight(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ShippingBox> {
    current.require_staff()?;
    let updated = db::boxes::recalculate_weight(&state.pool, id).await?;
    Ok(Json(updated))
}

/// POST /api/boxes/{id}/close
pub async fn close_box(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ShippingBox> {
    current.require_staff()?;
    let updated = db::boxes::close(&state.pool, id).await?;
    Ok(Json(updated))
}

/// POST /api/boxes/{id}/reopen
pub async fn reopen_box(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ShippingBox> {
    current.require_staff()?;
    let updated = db::boxes::reopen(&state.pool, id).await?;
    Ok(Json(updated))
}

/// DELETE /api/boxes/{id}
pub async fn delete_box(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    current.require_staff()?;
    db::boxes::delete(&state.pool, id).await?;
    db::audit::record(&state.pool, current.id, "delete_box", "box", id, None).await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
