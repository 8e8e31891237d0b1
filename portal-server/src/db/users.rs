//! Portal user accounts

use shared::error::{AppError, ErrorCode};
use shared::models::{Role, UserResponse};
use sqlx::{PgExecutor, PgPool};

use crate::auth::AuthRow;
use crate::error::{ServiceError, ServiceResult};

const USER_COLUMNS: &str = "id, email, display_name, role, client_id, active, created_at";

/// Row used by the login flow
#[derive(Debug, sqlx::FromRow)]
pub struct LoginRow {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub role: String,
    pub client_id: Option<i64>,
    pub active: bool,
}

fn map_unique(e: sqlx::Error, email: &str) -> ServiceError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::new(ErrorCode::UserEmailExists)
                .with_detail("email", email)
                .into()
        }
        _ => e.into(),
    }
}

pub async fn find_auth_row(pool: &PgPool, id: i64) -> ServiceResult<Option<AuthRow>> {
    let row = sqlx::query_as("SELECT role, active, client_id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_login(pool: &PgPool, email: &str) -> ServiceResult<Option<LoginRow>> {
    let row = sqlx::query_as(
        "SELECT id, email, hashed_password, role, client_id, active FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_password_hash(pool: &PgPool, id: i64) -> ServiceResult<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT hashed_password FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(h,)| h))
}

pub async fn find(pool: &PgPool, id: i64) -> ServiceResult<Option<UserResponse>> {
    let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_client(pool: &PgPool, client_id: i64) -> ServiceResult<Option<UserResponse>> {
    let user = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE client_id = $1 ORDER BY created_at LIMIT 1"
    ))
    .bind(client_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn list(pool: &PgPool, role: Option<Role>, limit: i64) -> ServiceResult<Vec<UserResponse>> {
    let users = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn count_by_role(pool: &PgPool, role: Role) -> ServiceResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert a user. Works on a pool or inside a transaction.
pub async fn create<'e>(
    db: impl PgExecutor<'e>,
    email: &str,
    hashed_password: &str,
    display_name: &str,
    role: Role,
    client_id: Option<i64>,
) -> ServiceResult<UserResponse> {
    let user = sqlx::query_as(&format!(
        r#"
        INSERT INTO users (id, email, hashed_password, display_name, role, client_id, active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(shared::util::snowflake_id())
    .bind(email)
    .bind(hashed_password)
    .bind(display_name)
    .bind(role.as_str())
    .bind(client_id)
    .bind(shared::util::now_millis())
    .fetch_one(db)
    .await
    .map_err(|e| map_unique(e, email))?;
    Ok(user)
}

pub async fn set_role(pool: &PgPool, id: i64, role: Role) -> ServiceResult<UserResponse> {
    let user = sqlx::query_as(&format!(
        "UPDATE users SET role = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
    ))
    .bind(role.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(user)
}

pub async fn set_active(pool: &PgPool, id: i64, active: bool) -> ServiceResult<UserResponse> {
    let user = sqlx::query_as(&format!(
        "UPDATE users SET active = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
    ))
    .bind(active)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(user)
}

pub async fn set_password(pool: &PgPool, id: i64, hashed_password: &str) -> ServiceResult<()> {
    let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
        .bind(hashed_password)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::new(ErrorCode::UserNotFound).into());
    }
    Ok(())
}
