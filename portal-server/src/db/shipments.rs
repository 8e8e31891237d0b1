//! Shipments and their box linkage
//!
//! Lock order: shipment, then its boxes. `client_ids` and `manager_uids` are
//! recomputed from the linked boxes on every membership change.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Scope, Shipment, ShipmentStatus, ShippingBox, check_uniform, merge_ids,
};
use sqlx::{PgConnection, PgPool};

use super::{boxes, counters};
use crate::error::ServiceResult;

const SHIPMENT_COLUMNS: &str = "id, code, country, box_type, box_ids, client_ids, manager_uids, \
     status, created_at, updated_at";

#[derive(Debug, Default)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub country: Option<String>,
    pub limit: i64,
}

fn not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::ShipmentNotFound).with_detail("shipment_id", id)
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    merge_ids(ids.iter().copied())
}

pub async fn find(pool: &PgPool, id: i64) -> ServiceResult<Option<Shipment>> {
    let shipment = sqlx::query_as(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(shipment)
}

pub async fn get(pool: &PgPool, id: i64) -> ServiceResult<Shipment> {
    Ok(find(pool, id).await?.ok_or_else(|| not_found(id))?)
}

async fn lock(conn: &mut PgConnection, id: i64) -> ServiceResult<Shipment> {
    let shipment: Option<Shipment> = sqlx::query_as(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(shipment.ok_or_else(|| not_found(id))?)
}

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    filter: &ShipmentFilter,
) -> ServiceResult<Vec<Shipment>> {
    let (manager, client) = scope.filters();
    let shipments = sqlx::query_as(&format!(
        r#"
        SELECT {SHIPMENT_COLUMNS} FROM shipments
        WHERE ($1::BIGINT IS NULL OR $1 = ANY(manager_uids))
          AND ($2::BIGINT IS NULL OR $2 = ANY(client_ids))
          AND ($3::TEXT IS NULL OR status = $3)
          AND ($4::TEXT IS NULL OR country = $4)
        ORDER BY code DESC
        LIMIT $5
        "#
    ))
    .bind(manager)
    .bind(client)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.country.as_deref().map(shared::models::normalize_country))
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;
    Ok(shipments)
}

/// Clients and partner managers behind a set of boxes.
async fn denormalize(
    conn: &mut PgConnection,
    linked: &[ShippingBox],
) -> ServiceResult<(Vec<i64>, Vec<i64>)> {
    let client_ids = merge_ids(linked.iter().map(|b| b.client_id));
    let managers: Vec<(i64,)> = sqlx::query_as(
        "SELECT DISTINCT manager_uid FROM clients WHERE id = ANY($1) AND manager_uid IS NOT NULL",
    )
    .bind(&client_ids)
    .fetch_all(conn)
    .await?;
    let manager_uids = merge_ids(managers.into_iter().map(|(uid,)| uid));
    Ok((client_ids, manager_uids))
}

/// Recompute `manager_uids` of every shipment carrying this client.
pub(crate) async fn refresh_managers_for_client(
    conn: &mut PgConnection,
    client_id: i64,
) -> ServiceResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE shipments s SET
            manager_uids = COALESCE(
                (SELECT array_agg(DISTINCT c.manager_uid ORDER BY c.manager_uid)
                 FROM clients c
                 WHERE c.id = ANY(s.client_ids) AND c.manager_uid IS NOT NULL),
                '{}'
            ),
            updated_at = $2
        WHERE $1 = ANY(s.client_ids)
        "#,
    )
    .bind(client_id)
    .bind(shared::util::now_millis())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

async fn link_boxes(conn: &mut PgConnection, shipment_id: Option<i64>, box_ids: &[i64]) -> ServiceResult<()> {
    sqlx::query("UPDATE boxes SET shipment_id = $1, updated_at = $2 WHERE id = ANY($3)")
        .bind(shipment_id)
        .bind(shared::util::now_millis())
        .bind(box_ids)
        .execute(conn)
        .await?;
    Ok(())
}

async fn save_membership(
    conn: &mut PgConnection,
    id: i64,
    box_ids: &[i64],
) -> ServiceResult<Shipment> {
    let linked = if box_ids.is_empty() {
        Vec::new()
    } else {
        boxes::lock_many(conn, box_ids).await?
    };
    let (client_ids, manager_uids) = denormalize(conn, &linked).await?;

    let shipment = sqlx::query_as(&format!(
        r#"
        UPDATE shipments SET box_ids = $1, client_ids = $2, manager_uids = $3, updated_at = $4
        WHERE id = $5
        RETURNING {SHIPMENT_COLUMNS}
        "#
    ))
    .bind(box_ids)
    .bind(&client_ids)
    .bind(&manager_uids)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(shipment)
}

/// Group closed, unlinked boxes of one country and type into a new shipment.
pub async fn create(pool: &PgPool, box_ids: &[i64]) -> ServiceResult<Shipment> {
    let box_ids = dedup(box_ids);
    if box_ids.is_empty() {
        return Err(AppError::new(ErrorCode::ShipmentEmpty).into());
    }

    let mut tx = pool.begin().await?;
    let linked = boxes::lock_many(&mut tx, &box_ids).await?;
    let (country, box_type) = check_uniform(&linked)?;

    let code = counters::next_value(&mut tx, counters::SHIPMENTS).await?;
    let (client_ids, manager_uids) = denormalize(&mut tx, &linked).await?;
    let now = shared::util::now_millis();

    let shipment: Shipment = sqlx::query_as(&format!(
        r#"
        INSERT INTO shipments (id, code, country, box_type, box_ids, client_ids, manager_uids,
                               status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'open', $8, $8)
        RETURNING {SHIPMENT_COLUMNS}
        "#
    ))
    .bind(shared::util::snowflake_id())
    .bind(code)
    .bind(&country)
    .bind(box_type.as_str())
    .bind(&box_ids)
    .bind(&client_ids)
    .bind(&manager_uids)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    link_boxes(&mut tx, Some(shipment.id), &box_ids).await?;
    tx.commit().await?;

    tracing::info!(
        shipment_id = shipment.id,
        code = shipment.code,
        country = %shipment.country,
        boxes = box_ids.len(),
        "Shipment created"
    );
    Ok(shipment)
}

/// Add boxes to an open shipment. They must match its country and type.
pub async fn add_boxes(pool: &PgPool, id: i64, box_ids: &[i64]) -> ServiceResult<Shipment> {
    let new_ids = dedup(box_ids);
    if new_ids.is_empty() {
        return Err(AppError::validation("No boxes given").into());
    }

    let mut tx = pool.begin().await?;
    let shipment = lock(&mut tx, id).await?;
    shipment.ensure_open()?;

    let new_ids: Vec<i64> = new_ids
        .into_iter()
        .filter(|bid| !shipment.box_ids.contains(bid))
        .collect();
    if new_ids.is_empty() {
        tx.rollback().await?;
        return Ok(shipment);
    }

    let candidates = boxes::lock_many(&mut tx, &new_ids).await?;
    for b in &candidates {
        shipment.check_compatible(b)?;
    }
    link_boxes(&mut tx, Some(id), &new_ids).await?;

    let all_ids = merge_ids(shipment.box_ids.iter().copied().chain(new_ids.iter().copied()));
    let updated = save_membership(&mut tx, id, &all_ids).await?;
    tx.commit().await?;

    tracing::info!(shipment_id = id, added = new_ids.len(), "Boxes added to shipment");
    Ok(updated)
}

/// Unlink a box from an open shipment.
pub async fn remove_box(pool: &PgPool, id: i64, box_id: i64) -> ServiceResult<Shipment> {
    let mut tx = pool.begin().await?;
    let shipment = lock(&mut tx, id).await?;
    shipment.ensure_open()?;
    if !shipment.box_ids.contains(&box_id) {
        return Err(AppError::new(ErrorCode::BoxNotFound)
            .with_detail("box_id", box_id)
            .with_detail("shipment_id", id)
            .into());
    }

    boxes::lock(&mut tx, box_id).await?;
    link_boxes(&mut tx, None, &[box_id]).await?;

    let remaining: Vec<i64> = shipment.box_ids.iter().copied().filter(|b| *b != box_id).collect();
    let updated = save_membership(&mut tx, id, &remaining).await?;
    tx.commit().await?;

    tracing::info!(shipment_id = id, box_id, "Box removed from shipment");
    Ok(updated)
}

/// Move a shipment one step forward.
pub async fn advance(pool: &PgPool, id: i64, status: ShipmentStatus) -> ServiceResult<Shipment> {
    let mut tx = pool.begin().await?;
    let shipment = lock(&mut tx, id).await?;
    shipment.status.ensure_transition(status)?;

    let updated: Shipment = sqlx::query_as(&format!(
        "UPDATE shipments SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {SHIPMENT_COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(
        shipment_id = id,
        from = shipment.status.as_str(),
        to = status.as_str(),
        "Shipment status changed"
    );
    Ok(updated)
}

/// Delete an open shipment, releasing its boxes.
pub async fn delete(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    let shipment = lock(&mut tx, id).await?;
    shipment.ensure_open()?;

    if !shipment.box_ids.is_empty() {
        boxes::lock_many(&mut tx, &shipment.box_ids).await?;
        link_boxes(&mut tx, None, &shipment.box_ids).await?;
    }
    sqlx::query("DELETE FROM shipments WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(shipment_id = id, "Shipment deleted");
    Ok(())
}
