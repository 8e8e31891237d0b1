//! Inbound package endpoints

use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{InboundPackage, PackageCreate, PackageStatus, PackageUpdate};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::packages::{PackageFilter, Received};
use crate::state::AppState;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/packages", get(list_packages).post(receive_package))
        .route("/api/packages/{id}", get(get_package).patch(update_package))
        .route("/api/packages/{id}/void", post(void_package))
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageListQuery {
    pub client_id: Option<i64>,
    pub status: Option<PackageStatus>,
    pub tracking: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/packages
pub async fn list_packages(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<PackageListQuery>,
) -> ApiResult<Vec<InboundPackage>> {
    let filter = PackageFilter {
        client_id: query.client_id,
        status: query.status,
        tracking: query.tracking,
        limit: db::clamp_limit(query.limit),
    };
    let packages = db::packages::list(&state.pool, current.scope, &filter).await?;
    Ok(Json(packages))
}

/// POST /api/packages
pub async fn receive_package(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<PackageCreate>,
) -> ApiResult<Received> {
    current.require_staff()?;
    let received = db::packages::receive(&state.pool, &req).await?;
    Ok(Json(received))
}

/// GET /api/packages/{id}
pub async fn get_package(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<InboundPackage> {
    let package = db::packages::get(&state.pool, id).await?;
    let client = db::clients::get(&state.pool, package.client_id).await?;
    current.ensure_client_visible(&client)?;
    Ok(Json(package))
}

/// PATCH /api/packages/{id}
pub async fn update_package(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<PackageUpdate>,
) -> ApiResult<InboundPackage> {
    current.require_staff()?;
    let package = db::packages::update(&state.pool, id, &req).await?;
    Ok(Json(package))
}

/// POST /api/packages/{id}/void
pub async fn void_package(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<InboundPackage> {
    current.require_staff()?;
    let package = db::packages::void(&state.pool, id).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "void_package",
        "package",
        id,
        Some(serde_json::json!({ "tracking": package.tracking })),
    )
    .await;
    Ok(Json(package))
}
