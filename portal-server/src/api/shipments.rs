//! Shipment endpoints

use axum::routing::{delete, get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Scope, Shipment, ShipmentBoxesAdd, ShipmentCreate, ShipmentStatus, ShipmentStatusUpdate,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::shipments::ShipmentFilter;
use crate::security_log;
use crate::state::AppState;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shipments", get(list_shipments).post(create_shipment))
        .route("/api/shipments/{id}", get(get_shipment).delete(delete_shipment))
        .route("/api/shipments/{id}/boxes", post(add_boxes))
        .route("/api/shipments/{id}/boxes/{box_id}", delete(remove_box))
        .route("/api/shipments/{id}/status", post(advance_shipment))
}

/// Whether the caller can see a shipment through its denormalised owners.
fn shipment_visible(scope: Scope, shipment: &Shipment) -> bool {
    match scope {
        Scope::All => true,
        Scope::Managed(uid) => shipment.manager_uids.contains(&uid),
        Scope::Client(client_id) => shipment.client_ids.contains(&client_id),
        Scope::Nothing => false,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ShipmentListQuery {
    pub status: Option<ShipmentStatus>,
    pub country: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/shipments
pub async fn list_shipments(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<Vec<Shipment>> {
    let filter = ShipmentFilter {
        status: query.status,
        country: query.country,
        limit: db::clamp_limit(query.limit),
    };
    let shipments = db::shipments::list(&state.pool, current.scope, &filter).await?;
    Ok(Json(shipments))
}

/// POST /api/shipments
pub async fn create_shipment(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ShipmentCreate>,
) -> ApiResult<Shipment> {
    current.require_staff()?;
    let shipment = db::shipments::create(&state.pool, &req.box_ids).await?;
    Ok(Json(shipment))
}

/// GET /api/shipments/{id}
pub async fn get_shipment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Shipment> {
    let shipment = db::shipments::get(&state.pool, id).await?;
    if !shipment_visible(current.scope, &shipment) {
        security_log!("WARN", "shipment_out_of_scope", user_id = current.id, shipment_id = id);
        return Err(AppError::new(ErrorCode::ShipmentNotFound).with_detail("shipment_id", id));
    }
    Ok(Json(shipment))
}

/// POST /api/shipments/{id}/boxes
pub async fn add_boxes(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ShipmentBoxesAdd>,
) -> ApiResult<Shipment> {
    current.require_staff()?;
    let shipment = db::shipments::add_boxes(&state.pool, id, &req.box_ids).await?;
    Ok(Json(shipment))
}

/// DELETE /api/shipments/{id}/boxes/{box_id}
pub async fn remove_box(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, box_id)): Path<(i64, i64)>,
) -> ApiResult<Shipment> {
    current.require_staff()?;
    let shipment = db::shipments::remove_box(&state.pool, id, box_id).await?;
    Ok(Json(shipment))
}

/// POST /api/shipments/{id}/status
pub async fn advance_shipment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ShipmentStatusUpdate>,
) -> ApiResult<Shipment> {
    current.require_staff()?;
    let shipment = db::shipments::advance(&state.pool, id, req.status).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "advance_shipment",
        "shipment",
        id,
        Some(serde_json::json!({ "status": shipment.status })),
    )
    .await;
    Ok(Json(shipment))
}

/// DELETE /api/shipments/{id}
pub async fn delete_shipment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    current.require_staff()?;
    db::shipments::delete(&state.pool, id).await?;
    db::audit::record(&state.pool, current.id, "delete_shipment", "shipment", id, None).await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::BoxType;

    fn shipment() -> Shipment {
        Shipment {
            id: 1,
            code: 1,
            country: "VE".into(),
            box_type: BoxType::Comercial,
            box_ids: vec![10, 11],
            client_ids: vec![100, 101],
            manager_uids: vec![7],
            status: ShipmentStatus::Open,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_shipment_visibility_by_scope() {
        let s = shipment();
        assert!(shipment_visible(Scope::All, &s));
        assert!(shipment_visible(Scope::Managed(7), &s));
        assert!(!shipment_visible(Scope::Managed(8), &s));
        assert!(shipment_visible(Scope::Client(101), &s));
        assert!(!shipment_visible(Scope::Client(102), &s));
        assert!(!shipment_visible(Scope::Nothing, &s));
    }
}
