//! Portal user administration

use axum::routing::{get, patch};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Role, UserCreate, UserResponse};

use crate::auth::CurrentUser;
use crate::state::AppState;
use crate::util::new_password_hash;
use crate::{db, security_log};

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}/role", patch(set_role))
        .route("/api/users/{id}/active", patch(set_active))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub limit: Option<i64>,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Vec<UserResponse>> {
    current.require_staff()?;
    let users = db::users::list(&state.pool, query.role, db::clamp_limit(query.limit)).await?;
    Ok(Json(users))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<UserCreate>,
) -> ApiResult<UserResponse> {
    current.require_staff()?;
    if !current.role.can_assign(req.role) {
        security_log!(
            "WARN",
            "role_assignment_denied",
            user_id = current.id,
            target_role = req.role.as_str()
        );
        return Err(AppError::new(ErrorCode::SuperadminRequired)
            .with_detail("role", req.role.as_str()));
    }

    let client_id = match (req.role, req.client_id) {
        (Role::Client, Some(client_id)) => {
            db::clients::get(&state.pool, client_id).await?;
            Some(client_id)
        }
        (Role::Client, None) => {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "client_id is required for client accounts",
            ));
        }
        (_, _) => None,
    };

    let email = shared::util::normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    let display_name = req.display_name.trim();
    let hashed = new_password_hash(&req.password)?;

    let user = db::users::create(
        &state.pool,
        &email,
        &hashed,
        if display_name.is_empty() { email.as_str() } else { display_name },
        req.role,
        client_id,
    )
    .await?;

    db::audit::record(
        &state.pool,
        current.id,
        "create_user",
        "user",
        user.id,
        Some(serde_json::json!({ "role": user.role, "email": user.email })),
    )
    .await;
    tracing::info!(user_id = user.id, role = user.role.as_str(), "User created");
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// PATCH /api/users/{id}/role
pub async fn set_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<UserResponse> {
    current.require_superadmin()?;
    if id == current.id {
        return Err(AppError::new(ErrorCode::UserCannotModifySelf));
    }

    let previous = db::users::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    if req.role == Role::Client && previous.client_id.is_none() {
        return Err(AppError::with_message(
            ErrorCode::InvalidRequest,
            "Only accounts linked to a client can become client users",
        ));
    }

    let user = db::users::set_role(&state.pool, id, req.role).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "set_role",
        "user",
        id,
        Some(serde_json::json!({ "from": previous.role, "to": user.role })),
    )
    .await;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// PATCH /api/users/{id}/active
pub async fn set_active(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<UserResponse> {
    current.require_superadmin()?;
    if id == current.id {
        return Err(AppError::new(ErrorCode::UserCannotModifySelf));
    }

    let user = db::users::set_active(&state.pool, id, req.active).await?;
    db::audit::record(
        &state.pool,
        current.id,
        if req.active { "enable_user" } else { "disable_user" },
        "user",
        id,
        None,
    )
    .await;
    Ok(Json(user))
}
