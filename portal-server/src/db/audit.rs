//! Audit log operations

use sqlx::PgPool;

use crate::BoxError;

/// Actor id for entries written by the service itself (webhooks)
pub const SYSTEM_ACTOR: i64 = 0;

/// Write an audit log entry
pub async fn log(
    pool: &PgPool,
    actor_id: i64,
    action: &str,
    entity: &str,
    entity_id: i64,
    detail: Option<&serde_json::Value>,
) -> Result<(), BoxError> {
    sqlx::query(
        "INSERT INTO audit_logs (actor_id, action, entity, entity_id, detail, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(actor_id)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(detail)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fire-and-forget audit write: failures are logged, never surfaced.
pub async fn record(
    pool: &PgPool,
    actor_id: i64,
    action: &str,
    entity: &str,
    entity_id: i64,
    detail: Option<serde_json::Value>,
) {
    if let Err(e) = log(pool, actor_id, action, entity, entity_id, detail.as_ref()).await {
        tracing::warn!(action, entity, entity_id, error = %e, "Audit log write failed");
    }
}
