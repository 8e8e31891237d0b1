//! Inbound packages

use shared::error::{AppError, ErrorCode};
use shared::models::{
    InboundPackage, PackageCreate, PackageStatus, PackageUpdate, Scope, normalize_tracking,
    validate_weight,
};
use sqlx::{PgConnection, PgPool};

use super::{alerts, boxes, clients};
use crate::error::ServiceResult;

pub(crate) const PACKAGE_COLUMNS: &str = "p.id, p.tracking, p.carrier, p.client_id, p.weight_lb, \
     p.photo_url, p.status, p.box_id, p.notes, p.received_at, p.updated_at";

#[derive(Debug, Default)]
pub struct PackageFilter {
    pub client_id: Option<i64>,
    pub status: Option<PackageStatus>,
    pub tracking: Option<String>,
    pub limit: i64,
}

/// Result of receiving a package
#[derive(Debug, serde::Serialize)]
pub struct Received {
    #[serde(flatten)]
    pub package: InboundPackage,
    /// Open tracking alerts closed by this intake
    pub resolved_alerts: u64,
}

pub async fn find(pool: &PgPool, id: i64) -> ServiceResult<Option<InboundPackage>> {
    let package = sqlx::query_as(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM inbound_packages p WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(package)
}

pub async fn get(pool: &PgPool, id: i64) -> ServiceResult<InboundPackage> {
    find(pool, id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::PackageNotFound)
            .with_detail("package_id", id)
            .into()
    })
}

async fn lock(conn: &mut PgConnection, id: i64) -> ServiceResult<InboundPackage> {
    let package: Option<InboundPackage> = sqlx::query_as(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM inbound_packages p WHERE p.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    package.ok_or_else(|| {
        AppError::new(ErrorCode::PackageNotFound)
            .with_detail("package_id", id)
            .into()
    })
}

/// Packages by id, in id order. Locks them when `for_update`.
pub(crate) async fn fetch_many(
    conn: &mut PgConnection,
    ids: &[i64],
    for_update: bool,
) -> ServiceResult<Vec<InboundPackage>> {
    let lock_clause = if for_update { "FOR UPDATE" } else { "" };
    let packages = sqlx::query_as(&format!(
        "SELECT {PACKAGE_COLUMNS} FROM inbound_packages p WHERE p.id = ANY($1) ORDER BY p.id {lock_clause}"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(packages)
}

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    filter: &PackageFilter,
) -> ServiceResult<Vec<InboundPackage>> {
    let (manager, client) = scope.filters();
    let tracking = filter
        .tracking
        .as_deref()
        .map(normalize_tracking)
        .filter(|t| !t.is_empty());

    let packages = sqlx::query_as(&format!(
        r#"
        SELECT {PACKAGE_COLUMNS}
        FROM inbound_packages p
        JOIN clients c ON c.id = p.client_id
        WHERE ($1::BIGINT IS NULL OR c.manager_uid = $1)
          AND ($2::BIGINT IS NULL OR p.client_id = $2)
          AND ($3::BIGINT IS NULL OR p.client_id = $3)
          AND ($4::TEXT IS NULL OR p.status = $4)
          AND ($5::TEXT IS NULL OR p.tracking LIKE $5 || '%')
        ORDER BY p.received_at DESC
        LIMIT $6
        "#
    ))
    .bind(manager)
    .bind(client)
    .bind(filter.client_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(tracking)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;
    Ok(packages)
}

/// Register a package at intake and close matching tracking alerts.
pub async fn receive(pool: &PgPool, data: &PackageCreate) -> ServiceResult<Received> {
    validate_weight(data.weight_lb)?;
    let tracking = normalize_tracking(&data.tracking);
    if tracking.is_empty() {
        return Err(AppError::validation("Tracking number is required").into());
    }

    let client = clients::get(pool, data.client_id).await?;
    if !client.activo {
        return Err(AppError::new(ErrorCode::ClientInactive)
            .with_detail("client_id", client.id)
            .into());
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM inbound_packages WHERE tracking = $1 AND status <> 'void' LIMIT 1",
    )
    .bind(&tracking)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some((package_id,)) = existing {
        return Err(AppError::new(ErrorCode::PackageTrackingExists)
            .with_detail("tracking", tracking)
            .with_detail("package_id", package_id)
            .into());
    }

    let package: InboundPackage = sqlx::query_as(
        r#"
        INSERT INTO inbound_packages (
            id, tracking, carrier, client_id, weight_lb, photo_url, status, box_id, notes,
            received_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'received', NULL, $7, $8, $8)
        RETURNING id, tracking, carrier, client_id, weight_lb, photo_url, status, box_id, notes,
                  received_at, updated_at
        "#,
    )
    .bind(shared::util::snowflake_id())
    .bind(&tracking)
    .bind(data.carrier.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    .bind(data.client_id)
    .bind(data.weight_lb)
    .bind(&data.photo_url)
    .bind(&data.notes)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::new(ErrorCode::PackageTrackingExists)
                .with_detail("tracking", tracking.clone())
                .into()
        }
        _ => crate::error::ServiceError::from(e),
    })?;

    let resolved_alerts =
        alerts::resolve_for_package(&mut tx, package.client_id, &package.tracking, package.id, now)
            .await?;

    tx.commit().await?;
    tracing::info!(
        package_id = package.id,
        tracking = %package.tracking,
        client_id = package.client_id,
        resolved_alerts,
        "Package received"
    );
    Ok(Received {
        package,
        resolved_alerts,
    })
}

/// Edit a package. A weight change on a boxed package recomputes the box.
pub async fn update(pool: &PgPool, id: i64, data: &PackageUpdate) -> ServiceResult<InboundPackage> {
    if let Some(weight) = data.weight_lb {
        validate_weight(weight)?;
    }

    // Lock order is box before package, as in the box operations
    let current = get(pool, id).await?;
    let mut tx = pool.begin().await?;
    if let Some(box_id) = current.box_id {
        boxes::lock(&mut tx, box_id).await?;
    }
    let package = lock(&mut tx, id).await?;
    if package.box_id != current.box_id {
        return Err(AppError::with_message(
            ErrorCode::InvalidRequest,
            "Package moved while editing, retry",
        )
        .into());
    }
    if package.status == PackageStatus::Void {
        return Err(AppError::new(ErrorCode::PackageNotReceived)
            .with_detail("package_id", id)
            .into());
    }

    let updated: InboundPackage = sqlx::query_as(
        r#"
        UPDATE inbound_packages SET
            carrier = COALESCE($1, carrier),
            weight_lb = COALESCE($2, weight_lb),
            photo_url = COALESCE($3, photo_url),
            notes = COALESCE($4, notes),
            updated_at = $5
        WHERE id = $6
        RETURNING id, tracking, carrier, client_id, weight_lb, photo_url, status, box_id, notes,
                  received_at, updated_at
        "#,
    )
    .bind(&data.carrier)
    .bind(data.weight_lb)
    .bind(&data.photo_url)
    .bind(&data.notes)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(box_id) = updated.box_id
        && updated.weight_lb != package.weight_lb
    {
        boxes::refresh_weight(&mut tx, box_id).await?;
    }

    tx.commit().await?;
    Ok(updated)
}

/// Void a package that has not been boxed.
pub async fn void(pool: &PgPool, id: i64) -> ServiceResult<InboundPackage> {
    let mut tx = pool.begin().await?;
    let package = lock(&mut tx, id).await?;
    package.ensure_voidable()?;

    let updated: InboundPackage = sqlx::query_as(
        r#"
        UPDATE inbound_packages SET status = 'void', updated_at = $1
        WHERE id = $2
        RETURNING id, tracking, carrier, client_id, weight_lb, photo_url, status, box_id, notes,
                  received_at, updated_at
        "#,
    )
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(package_id = id, "Package voided");
    Ok(updated)
}
