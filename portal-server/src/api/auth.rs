//! Authentication endpoints: login, me, change-password

use axum::routing::{get, post};
use axum::{Json, Router, extract::State, middleware};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Role, Scope, UserResponse};

use crate::auth::jwt::create_token;
use crate::auth::rate_limit::login_rate_limit;
use crate::auth::CurrentUser;
use crate::state::AppState;
use crate::util::{new_password_hash, verify_password};
use crate::{db, security_log};

use super::ApiResult;

pub fn router(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/api/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    Router::new()
        .merge(login)
        .route("/api/auth/me", get(me))
        .route("/api/auth/change-password", post(change_password))
}

/// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub role: Role,
    pub client_id: Option<i64>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let email = shared::util::normalize_email(&req.email);
    let Some(user) = db::users::find_login(&state.pool, &email).await? else {
        security_log!("WARN", "login_unknown_email", email = email.as_str());
        return Err(AppError::invalid_credentials());
    };

    if !verify_password(&req.password, &user.hashed_password) {
        security_log!("WARN", "login_bad_password", user_id = user.id);
        return Err(AppError::invalid_credentials());
    }
    if !user.active {
        security_log!("WARN", "login_disabled_account", user_id = user.id);
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let role = Role::parse(&user.role).unwrap_or(Role::Client);
    let token = create_token(
        user.id,
        &user.email,
        role,
        user.client_id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )
    .map_err(|e| {
        tracing::error!("JWT creation failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    tracing::info!(user_id = user.id, role = role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        role,
        client_id: user.client_id,
    }))
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Role after reconciling token and stored role
    pub effective_role: Role,
    pub scope: Scope,
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<MeResponse> {
    let user = db::users::find(&state.pool, current.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    Ok(Json(MeResponse {
        user,
        effective_role: current.role,
        scope: current.scope,
    }))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<serde_json::Value> {
    let hash = db::users::find_password_hash(&state.pool, current.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    if !verify_password(&req.current_password, &hash) {
        security_log!("WARN", "change_password_bad_current", user_id = current.id);
        return Err(AppError::invalid_credentials());
    }

    let new_hash = new_password_hash(&req.new_password)?;
    db::users::set_password(&state.pool, current.id, &new_hash).await?;
    db::audit::record(&state.pool, current.id, "change_password", "user", current.id, None).await;

    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}
