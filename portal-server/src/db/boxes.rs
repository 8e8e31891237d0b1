//! Boxes and their package linkage
//!
//! Lock order: box, then its packages. Every write that changes `item_ids`
//! recomputes `weight_lb` from the package rows in the same transaction.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    BoxCreate, BoxDetail, BoxStatus, Scope, ShippingBox, total_weight,
};
use sqlx::{PgConnection, PgPool};

use super::{clients, counters, packages};
use crate::error::ServiceResult;

pub(crate) const BOX_COLUMNS: &str = "b.id, b.code, b.client_id, b.country, b.box_type, b.status, \
     b.item_ids, b.weight_lb, b.shipment_id, b.created_at, b.updated_at";

#[derive(Debug, Default)]
pub struct BoxFilter {
    pub client_id: Option<i64>,
    pub status: Option<BoxStatus>,
    pub shipment_id: Option<i64>,
    /// Only boxes not yet linked to a shipment
    pub unassigned: bool,
    pub limit: i64,
}

fn not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::BoxNotFound).with_detail("box_id", id)
}

pub async fn find(pool: &PgPool, id: i64) -> ServiceResult<Option<ShippingBox>> {
    let b = sqlx::query_as(&format!("SELECT {BOX_COLUMNS} FROM boxes b WHERE b.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(b)
}

pub async fn get(pool: &PgPool, id: i64) -> ServiceResult<ShippingBox> {
    Ok(find(pool, id).await?.ok_or_else(|| not_found(id))?)
}

pub(crate) async fn lock(conn: &mut PgConnection, id: i64) -> ServiceResult<ShippingBox> {
    let b: Option<ShippingBox> = sqlx::query_as(&format!(
        "SELECT {BOX_COLUMNS} FROM boxes b WHERE b.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(b.ok_or_else(|| not_found(id))?)
}

/// Lock several boxes in id order. Fails on the first unknown id.
pub(crate) async fn lock_many(conn: &mut PgConnection, ids: &[i64]) -> ServiceResult<Vec<ShippingBox>> {
    let found: Vec<ShippingBox> = sqlx::query_as(&format!(
        "SELECT {BOX_COLUMNS} FROM boxes b WHERE b.id = ANY($1) ORDER BY b.id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;

    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|b| b.id == **id)) {
        return Err(not_found(*missing).into());
    }
    Ok(found)
}

pub async fn list(pool: &PgPool, scope: Scope, filter: &BoxFilter) -> ServiceResult<Vec<ShippingBox>> {
    let (manager, client) = scope.filters();
    let boxes = sqlx::query_as(&format!(
        r#"
        SELECT {BOX_COLUMNS}
        FROM boxes b
        JOIN clients c ON c.id = b.client_id
        WHERE ($1::BIGINT IS NULL OR c.manager_uid = $1)
          AND ($2::BIGINT IS NULL OR b.client_id = $2)
          AND ($3::BIGINT IS NULL OR b.client_id = $3)
          AND ($4::TEXT IS NULL OR b.status = $4)
          AND ($5::BIGINT IS NULL OR b.shipment_id = $5)
          AND (NOT $6 OR b.shipment_id IS NULL)
        ORDER BY b.code DESC
        LIMIT $7
        "#
    ))
    .bind(manager)
    .bind(client)
    .bind(filter.client_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.shipment_id)
    .bind(filter.unassigned)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;
    Ok(boxes)
}

/// Box with its packages resolved, in `item_ids` order.
pub async fn detail(pool: &PgPool, id: i64) -> ServiceResult<BoxDetail> {
    let shipping_box = get(pool, id).await?;
    let mut conn = pool.acquire().await?;
    let items = ordered_items(&mut conn, &shipping_box.item_ids).await?;
    Ok(BoxDetail {
        shipping_box,
        items,
    })
}

async fn ordered_items(
    conn: &mut PgConnection,
    item_ids: &[i64],
) -> ServiceResult<Vec<shared::models::InboundPackage>> {
    let mut items = packages::fetch_many(conn, item_ids, false).await?;
    items.sort_by_key(|p| item_ids.iter().position(|id| *id == p.id));
    Ok(items)
}

/// Open a new box for a client. Country is copied from the client.
pub async fn create(pool: &PgPool, data: &BoxCreate) -> ServiceResult<ShippingBox> {
    let client = clients::get(pool, data.client_id).await?;
    if !client.activo {
        return Err(AppError::new(ErrorCode::ClientInactive)
            .with_detail("client_id", client.id)
            .into());
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    let code = counters::next_value(&mut tx, counters::BOXES).await?;

    let b: ShippingBox = sqlx::query_as(
        r#"
        INSERT INTO boxes (id, code, client_id, country, box_type, status, item_ids, weight_lb,
                           shipment_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'open', '{}', 0, NULL, $6, $6)
        RETURNING id, code, client_id, country, box_type, status, item_ids, weight_lb,
                  shipment_id, created_at, updated_at
        "#,
    )
    .bind(shared::util::snowflake_id())
    .bind(code)
    .bind(client.id)
    .bind(&client.country)
    .bind(data.box_type.as_str())
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(box_id = b.id, code = b.code, client_id = b.client_id, "Box created");
    Ok(b)
}

/// Sum the weights of the given packages from their rows.
async fn weight_of(conn: &mut PgConnection, item_ids: &[i64]) -> ServiceResult<Decimal> {
    if item_ids.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let items = packages::fetch_many(conn, item_ids, false).await?;
    Ok(total_weight(&items))
}

async fn save_items(
    conn: &mut PgConnection,
    id: i64,
    item_ids: &[i64],
    weight_lb: Decimal,
) -> ServiceResult<ShippingBox> {
    let b = sqlx::query_as(
        r#"
        UPDATE boxes SET item_ids = $1, weight_lb = $2, updated_at = $3
        WHERE id = $4
        RETURNING id, code, client_id, country, box_type, status, item_ids, weight_lb,
                  shipment_id, created_at, updated_at
        "#,
    )
    .bind(item_ids)
    .bind(weight_lb)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(b)
}

/// Recompute a locked box's weight inside the caller's transaction.
pub(crate) async fn refresh_weight(conn: &mut PgConnection, id: i64) -> ServiceResult<ShippingBox> {
    let b = lock(conn, id).await?;
    let weight = weight_of(conn, &b.item_ids).await?;
    save_items(conn, id, &b.item_ids, weight).await
}

/// Add received packages of the box's client to an open box.
pub async fn add_items(pool: &PgPool, id: i64, package_ids: &[i64]) -> ServiceResult<BoxDetail> {
    let mut requested = package_ids.to_vec();
    requested.sort_unstable();
    requested.dedup();
    if requested.is_empty() {
        return Err(AppError::validation("No packages given").into());
    }

    let mut tx = pool.begin().await?;
    let b = lock(&mut tx, id).await?;
    b.ensure_open()?;

    let found = packages::fetch_many(&mut tx, &requested, true).await?;
    if let Some(missing) = requested.iter().find(|pid| !found.iter().any(|p| p.id == **pid)) {
        return Err(AppError::new(ErrorCode::PackageNotFound)
            .with_detail("package_id", *missing)
            .into());
    }
    for package in &found {
        b.check_item(package)?;
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE inbound_packages SET status = 'boxed', box_id = $1, updated_at = $2 WHERE id = ANY($3)",
    )
    .bind(id)
    .bind(now)
    .bind(&requested)
    .execute(&mut *tx)
    .await?;

    let item_ids = b.with_items(&requested);
    let weight = weight_of(&mut tx, &item_ids).await?;
    let shipping_box = save_items(&mut tx, id, &item_ids, weight).await?;
    let items = ordered_items(&mut tx, &shipping_box.item_ids).await?;

    tx.commit().await?;
    tracing::info!(box_id = id, added = requested.len(), weight_lb = %weight, "Packages boxed");
    Ok(BoxDetail {
        shipping_box,
        items,
    })
}

/// Take a package out of an open box; it returns to `received`.
pub async fn remove_item(pool: &PgPool, id: i64, package_id: i64) -> ServiceResult<BoxDetail> {
    let mut tx = pool.begin().await?;
    let b = lock(&mut tx, id).await?;
    b.ensure_open()?;
    if !b.item_ids.contains(&package_id) {
        return Err(AppError::new(ErrorCode::BoxItemNotFound)
            .with_detail("box_id", id)
            .with_detail("package_id", package_id)
            .into());
    }

    sqlx::query(
        "UPDATE inbound_packages SET status = 'received', box_id = NULL, updated_at = $1 WHERE id = $2",
    )
    .bind(shared::util::now_millis())
    .bind(package_id)
    .execute(&mut *tx)
    .await?;

    let item_ids: Vec<i64> = b.item_ids.iter().copied().filter(|pid| *pid != package_id).collect();
    let weight = weight_of(&mut tx, &item_ids).await?;
    let shipping_box = save_items(&mut tx, id, &item_ids, weight).await?;
    let items = ordered_items(&mut tx, &shipping_box.item_ids).await?;

    tx.commit().await?;
    tracing::info!(box_id = id, package_id, weight_lb = %weight, "Package unboxed");
    Ok(BoxDetail {
        shipping_box,
        items,
    })
}

/// Recompute weight from the package rows.
pub async fn recalculate_weight(pool: &PgPool, id: i64) -> ServiceResult<ShippingBox> {
    let mut tx = pool.begin().await?;
    let before = lock(&mut tx, id).await?;
    let b = refresh_weight(&mut tx, id).await?;
    tx.commit().await?;
    if before.weight_lb != b.weight_lb {
        tracing::warn!(
            box_id = id,
            stored = %before.weight_lb,
            computed = %b.weight_lb,
            "Box weight drift corrected"
        );
    }
    Ok(b)
}

async fn set_status(conn: &mut PgConnection, id: i64, status: BoxStatus) -> ServiceResult<ShippingBox> {
    let b = sqlx::query_as(
        r#"
        UPDATE boxes SET status = $1, updated_at = $2
        WHERE id = $3
        RETURNING id, code, client_id, country, box_type, status, item_ids, weight_lb,
                  shipment_id, created_at, updated_at
        "#,
    )
    .bind(status.as_str())
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(b)
}

pub async fn close(pool: &PgPool, id: i64) -> ServiceResult<ShippingBox> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id).await?.ensure_closable()?;
    let b = set_status(&mut tx, id, BoxStatus::Closed).await?;
    tx.commit().await?;
    Ok(b)
}

pub async fn reopen(pool: &PgPool, id: i64) -> ServiceResult<ShippingBox> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id).await?.ensure_reopenable()?;
    let b = set_status(&mut tx, id, BoxStatus::Open).await?;
    tx.commit().await?;
    Ok(b)
}

/// Delete an empty, unlinked box.
pub async fn delete(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id).await?.ensure_deletable()?;
    sqlx::query("DELETE FROM boxes WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!(box_id = id, "Box deleted");
    Ok(())
}
