//! Client management endpoints

use axum::routing::{get, patch, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Client, ClientCreate, ClientUpdate, Role};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::clients::{ClientFilter, NewAccount};
use crate::state::AppState;
use crate::util::{generate_temp_password, new_password_hash};

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/clients/reindex", post(reindex_search_tokens))
        .route(
            "/api/clients/{id}",
            get(get_client).patch(update_client).delete(delete_client),
        )
        .route("/api/clients/{id}/activo", patch(set_activo))
        .route("/api/clients/{id}/reset-password", post(reset_client_password))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    pub q: Option<String>,
    pub activo: Option<bool>,
    pub limit: Option<i64>,
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ClientListQuery>,
) -> ApiResult<Vec<Client>> {
    let filter = ClientFilter {
        q: query.q,
        activo: query.activo,
        limit: db::clamp_limit(query.limit),
    };
    let clients = db::clients::list(&state.pool, current.scope, &filter).await?;
    Ok(Json(clients))
}

/// POST /api/clients
///
/// Partner admins always own the clients they create. A `password` creates
/// the client's login together with the client.
pub async fn create_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ClientCreate>,
) -> ApiResult<Client> {
    current.require_manager()?;

    let manager_uid = if current.role == Role::PartnerAdmin {
        Some(current.id)
    } else {
        req.manager_uid
    };

    let login = match &req.password {
        Some(password) => {
            let email = req
                .email
                .as_deref()
                .map(shared::util::normalize_email)
                .filter(|e| !e.is_empty())
                .ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::RequiredField,
                        "An email is required to create the client login",
                    )
                })?;
            Some((email, new_password_hash(password)?))
        }
        None => None,
    };
    let account = login.as_ref().map(|(email, hashed)| NewAccount {
        email,
        hashed_password: hashed,
    });

    let client = db::clients::create(&state.pool, &req, manager_uid, account).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "create_client",
        "client",
        client.id,
        Some(serde_json::json!({ "code": client.code, "with_login": login.is_some() })),
    )
    .await;
    Ok(Json(client))
}

/// GET /api/clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Client> {
    let client = db::clients::get(&state.pool, id).await?;
    current.ensure_client_visible(&client)?;
    Ok(Json(client))
}

/// PATCH /api/clients/{id}
pub async fn update_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ClientUpdate>,
) -> ApiResult<Client> {
    let before = db::clients::get(&state.pool, id).await?;
    current.ensure_client_manageable(&before)?;

    let client = db::clients::update(&state.pool, id, &req, current.is_staff()).await?;
    if client.manager_uid != before.manager_uid {
        let detail = serde_json::json!({
            "from": before.manager_uid,
            "to": client.manager_uid,
        });
        db::audit::record(&state.pool, current.id, "reassign_manager", "client", id, Some(detail))
            .await;
    }
    Ok(Json(client))
}

#[derive(Deserialize)]
pub struct SetActivoRequest {
    pub activo: bool,
}

/// PATCH /api/clients/{id}/activo
pub async fn set_activo(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetActivoRequest>,
) -> ApiResult<Client> {
    let client = db::clients::get(&state.pool, id).await?;
    current.ensure_client_manageable(&client)?;

    let client = db::clients::set_activo(&state.pool, id, req.activo).await?;
    db::audit::record(
        &state.pool,
        current.id,
        if req.activo { "activate_client" } else { "deactivate_client" },
        "client",
        id,
        None,
    )
    .await;
    Ok(Json(client))
}

/// DELETE /api/clients/{id}
pub async fn delete_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    current.require_superadmin()?;

    let client = db::clients::get(&state.pool, id).await?;
    db::clients::delete(&state.pool, id).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "delete_client",
        "client",
        id,
        Some(serde_json::json!({ "code": client.code, "name": client.name })),
    )
    .await;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /api/clients/{id}/reset-password
///
/// Sets a random temporary password on the client's login and returns it once.
pub async fn reset_client_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let client = db::clients::get(&state.pool, id).await?;
    current.ensure_client_manageable(&client)?;

    let user = db::users::find_by_client(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ClientHasNoAccount).with_detail("client_id", id))?;

    let temp_password = generate_temp_password();
    let hashed = new_password_hash(&temp_password)?;
    db::users::set_password(&state.pool, user.id, &hashed).await?;

    db::audit::record(&state.pool, current.id, "reset_client_password", "client", id, None).await;
    tracing::info!(client_id = id, user_id = user.id, "Client password reset");

    Ok(Json(serde_json::json!({
        "email": user.email,
        "temporary_password": temp_password,
    })))
}

/// POST /api/clients/reindex
pub async fn reindex_search_tokens(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<serde_json::Value> {
    current.require_superadmin()?;
    let updated = db::clients::reindex_search_tokens(&state.pool).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}
