//! Tracking alerts

use shared::error::{AppError, ErrorCode};
use shared::models::{AlertStatus, Scope, TrackingAlert, normalize_tracking};
use sqlx::{PgConnection, PgPool};

use crate::error::ServiceResult;

const ALERT_COLUMNS: &str = "a.id, a.client_id, a.tracking, a.note, a.status, a.created_by, \
     a.package_id, a.created_at, a.updated_at";

const RETURNING: &str =
    "RETURNING id, client_id, tracking, note, status, created_by, package_id, created_at, updated_at";

#[derive(Debug, Default)]
pub struct AlertFilter {
    pub client_id: Option<i64>,
    pub status: Option<AlertStatus>,
    pub limit: i64,
}

pub async fn list(pool: &PgPool, scope: Scope, filter: &AlertFilter) -> ServiceResult<Vec<TrackingAlert>> {
    let (manager, client) = scope.filters();
    let alerts = sqlx::query_as(&format!(
        r#"
        SELECT {ALERT_COLUMNS}
        FROM tracking_alerts a
        JOIN clients c ON c.id = a.client_id
        WHERE ($1::BIGINT IS NULL OR c.manager_uid = $1)
          AND ($2::BIGINT IS NULL OR a.client_id = $2)
          AND ($3::BIGINT IS NULL OR a.client_id = $3)
          AND ($4::TEXT IS NULL OR a.status = $4)
        ORDER BY a.created_at DESC
        LIMIT $5
        "#
    ))
    .bind(manager)
    .bind(client)
    .bind(filter.client_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;
    Ok(alerts)
}

/// Announce an expected tracking number for a client.
///
/// If a live package with that tracking already exists for the client the
/// alert is stored as resolved right away.
pub async fn create(
    pool: &PgPool,
    client_id: i64,
    tracking: &str,
    note: Option<&str>,
    created_by: i64,
) -> ServiceResult<TrackingAlert> {
    let tracking = normalize_tracking(tracking);
    if tracking.is_empty() {
        return Err(AppError::validation("Tracking number is required").into());
    }

    let mut tx = pool.begin().await?;

    let received: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM inbound_packages WHERE tracking = $1 AND client_id = $2 AND status <> 'void' LIMIT 1",
    )
    .bind(&tracking)
    .bind(client_id)
    .fetch_optional(&mut *tx)
    .await?;

    if received.is_none() {
        let open: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM tracking_alerts WHERE tracking = $1 AND client_id = $2 AND status = 'open' LIMIT 1",
        )
        .bind(&tracking)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((alert_id,)) = open {
            return Err(AppError::new(ErrorCode::AlertAlreadyOpen)
                .with_detail("alert_id", alert_id)
                .with_detail("tracking", tracking)
                .into());
        }
    }

    let (status, package_id) = match received {
        Some((package_id,)) => (AlertStatus::Resolved, Some(package_id)),
        None => (AlertStatus::Open, None),
    };
    let now = shared::util::now_millis();

    let alert: TrackingAlert = sqlx::query_as(&format!(
        r#"
        INSERT INTO tracking_alerts (id, client_id, tracking, note, status, created_by, package_id,
                                     created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        {RETURNING}
        "#
    ))
    .bind(shared::util::snowflake_id())
    .bind(client_id)
    .bind(&tracking)
    .bind(note.map(str::trim).filter(|n| !n.is_empty()))
    .bind(status.as_str())
    .bind(created_by)
    .bind(package_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::new(ErrorCode::AlertAlreadyOpen)
                .with_detail("tracking", tracking.clone())
                .into()
        }
        _ => crate::error::ServiceError::from(e),
    })?;

    tx.commit().await?;
    tracing::info!(alert_id = alert.id, client_id, status = status.as_str(), "Tracking alert created");
    Ok(alert)
}

/// Close an open alert as resolved or ignored.
pub async fn close(pool: &PgPool, id: i64, status: AlertStatus) -> ServiceResult<TrackingAlert> {
    if status == AlertStatus::Open {
        return Err(AppError::invalid_request("Alerts can only be resolved or ignored").into());
    }

    let mut tx = pool.begin().await?;
    let alert: Option<TrackingAlert> = sqlx::query_as(&format!(
        "SELECT {ALERT_COLUMNS} FROM tracking_alerts a WHERE a.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let alert = alert
        .ok_or_else(|| AppError::new(ErrorCode::AlertNotFound).with_detail("alert_id", id))?;
    alert.ensure_open()?;

    let updated: TrackingAlert = sqlx::query_as(&format!(
        "UPDATE tracking_alerts SET status = $1, updated_at = $2 WHERE id = $3 {RETURNING}"
    ))
    .bind(status.as_str())
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Resolve the client's open alerts for a tracking number at intake.
pub(crate) async fn resolve_for_package(
    conn: &mut PgConnection,
    client_id: i64,
    tracking: &str,
    package_id: i64,
    now: i64,
) -> ServiceResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE tracking_alerts SET status = 'resolved', package_id = $1, updated_at = $2
        WHERE client_id = $3 AND tracking = $4 AND status = 'open'
        "#,
    )
    .bind(package_id)
    .bind(now)
    .bind(client_id)
    .bind(tracking)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
