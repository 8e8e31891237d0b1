//! Tracking alert endpoints

use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{AlertCreate, AlertStatus, Role, TrackingAlert};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::alerts::AlertFilter;
use crate::state::AppState;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/alerts", get(list_alerts).post(create_alert))
        .route("/api/alerts/{id}/resolve", post(resolve_alert))
        .route("/api/alerts/{id}/ignore", post(ignore_alert))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertListQuery {
    pub client_id: Option<i64>,
    pub status: Option<AlertStatus>,
    pub limit: Option<i64>,
}

/// GET /api/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<AlertListQuery>,
) -> ApiResult<Vec<TrackingAlert>> {
    let filter = AlertFilter {
        client_id: query.client_id,
        status: query.status,
        limit: db::clamp_limit(query.limit),
    };
    let alerts = db::alerts::list(&state.pool, current.scope, &filter).await?;
    Ok(Json(alerts))
}

/// POST /api/alerts
///
/// Client users always raise alerts on their own account.
pub async fn create_alert(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<AlertCreate>,
) -> ApiResult<TrackingAlert> {
    let client_id = if current.role == Role::Client {
        current.client_id.ok_or_else(|| {
            AppError::with_message(ErrorCode::ClientNotFound, "No client linked to this account")
        })?
    } else {
        req.client_id.ok_or_else(|| {
            AppError::with_message(ErrorCode::RequiredField, "client_id is required")
        })?
    };

    let client = db::clients::get(&state.pool, client_id).await?;
    current.ensure_client_visible(&client)?;

    let alert = db::alerts::create(
        &state.pool,
        client_id,
        &req.tracking,
        req.note.as_deref(),
        current.id,
    )
    .await?;
    Ok(Json(alert))
}

async fn close_alert(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
    status: AlertStatus,
) -> ApiResult<TrackingAlert> {
    current.require_staff()?;
    let alert = db::alerts::close(&state.pool, id, status).await?;
    tracing::info!(alert_id = id, status = status.as_str(), user_id = current.id, "Alert closed");
    Ok(Json(alert))
}

/// POST /api/alerts/{id}/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<TrackingAlert> {
    close_alert(&state, &current, id, AlertStatus::Resolved).await
}

/// POST /api/alerts/{id}/ignore
pub async fn ignore_alert(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<TrackingAlert> {
    close_alert(&state, &current, id, AlertStatus::Ignored).await
}
