//! Client accounts

use shared::error::{AppError, ErrorCode};
use shared::models::{Client, ClientCreate, ClientUpdate, Role, Scope, normalize_country};
use shared::search::{client_tokens, normalize_query};
use sqlx::{PgConnection, PgPool};

use super::{counters, shipments, users};
use crate::error::ServiceResult;

const CLIENT_COLUMNS: &str = "id, code, name, email, phone, country, state, city, address, \
     postal_code, document_type, document_number, manager_uid, activo, search_tokens, \
     created_at, updated_at";

/// Login account created together with a client
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub hashed_password: &'a str,
}

#[derive(Debug, Default)]
pub struct ClientFilter {
    pub q: Option<String>,
    pub activo: Option<bool>,
    pub limit: i64,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

pub async fn find(pool: &PgPool, id: i64) -> ServiceResult<Option<Client>> {
    let client = sqlx::query_as(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(client)
}

/// Load a client or fail with `ClientNotFound`.
pub async fn get(pool: &PgPool, id: i64) -> ServiceResult<Client> {
    find(pool, id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::ClientNotFound)
            .with_detail("client_id", id)
            .into()
    })
}

async fn lock(conn: &mut PgConnection, id: i64) -> ServiceResult<Client> {
    let client: Option<Client> = sqlx::query_as(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    client.ok_or_else(|| {
        AppError::new(ErrorCode::ClientNotFound)
            .with_detail("client_id", id)
            .into()
    })
}

pub async fn list(pool: &PgPool, scope: Scope, filter: &ClientFilter) -> ServiceResult<Vec<Client>> {
    let (manager, client) = scope.filters();
    let token = filter.q.as_deref().and_then(normalize_query);

    let clients = sqlx::query_as(&format!(
        r#"
        SELECT {CLIENT_COLUMNS} FROM clients
        WHERE ($1::BIGINT IS NULL OR manager_uid = $1)
          AND ($2::BIGINT IS NULL OR id = $2)
          AND ($3::TEXT IS NULL OR $3 = ANY(search_tokens))
          AND ($4::BOOLEAN IS NULL OR activo = $4)
        ORDER BY code DESC
        LIMIT $5
        "#
    ))
    .bind(manager)
    .bind(client)
    .bind(token)
    .bind(filter.activo)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

/// Create a client with the next sequential code, optionally with its
/// `client` login, in one transaction.
pub async fn create(
    pool: &PgPool,
    data: &ClientCreate,
    manager_uid: Option<i64>,
    account: Option<NewAccount<'_>>,
) -> ServiceResult<Client> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Client name is required").into());
    }
    let country = normalize_country(&data.country);
    if country.is_empty() {
        return Err(AppError::validation("Client country is required").into());
    }
    let email = trimmed(&data.email).map(|e| shared::util::normalize_email(&e));
    let document_number = trimmed(&data.document_number);

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    if let Some(uid) = manager_uid {
        ensure_manager(&mut tx, uid).await?;
    }

    let code = counters::next_value(&mut tx, counters::CLIENTS).await?;
    let tokens = client_tokens(name, email.as_deref(), code, document_number.as_deref());

    let client: Client = sqlx::query_as(&format!(
        r#"
        INSERT INTO clients (
            id, code, name, email, phone, country, state, city, address, postal_code,
            document_type, document_number, manager_uid, activo, search_tokens,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, TRUE, $14, $15, $15)
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(shared::util::snowflake_id())
    .bind(code)
    .bind(name)
    .bind(&email)
    .bind(trimmed(&data.phone))
    .bind(&country)
    .bind(trimmed(&data.state))
    .bind(trimmed(&data.city))
    .bind(trimmed(&data.address))
    .bind(trimmed(&data.postal_code))
    .bind(trimmed(&data.document_type))
    .bind(&document_number)
    .bind(manager_uid)
    .bind(&tokens)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(account) = account {
        users::create(
            &mut *tx,
            account.email,
            account.hashed_password,
            name,
            Role::Client,
            Some(client.id),
        )
        .await?;
    }

    tx.commit().await?;
    tracing::info!(client_id = client.id, code = client.code, "Client created");
    Ok(client)
}

/// Partial update. `manager_uid` is only applied when `allow_manager_change`.
pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &ClientUpdate,
    allow_manager_change: bool,
) -> ServiceResult<Client> {
    let mut tx = pool.begin().await?;
    let mut client = lock(&mut tx, id).await?;

    if let Some(name) = trimmed(&data.name) {
        client.name = name;
    }
    if let Some(country) = data.country.as_deref().map(normalize_country) {
        if country.is_empty() {
            return Err(AppError::validation("Client country is required").into());
        }
        client.country = country;
    }
    if let Some(email) = trimmed(&data.email) {
        client.email = Some(shared::util::normalize_email(&email));
    }
    for (field, value) in [
        (&mut client.phone, &data.phone),
        (&mut client.state, &data.state),
        (&mut client.city, &data.city),
        (&mut client.address, &data.address),
        (&mut client.postal_code, &data.postal_code),
        (&mut client.document_type, &data.document_type),
        (&mut client.document_number, &data.document_number),
    ] {
        if value.is_some() {
            *field = trimmed(value);
        }
    }
    let previous_manager = client.manager_uid;
    if allow_manager_change {
        match (data.clear_manager, data.manager_uid) {
            (true, Some(_)) => {
                return Err(AppError::invalid_request(
                    "manager_uid and clear_manager are mutually exclusive",
                )
                .into());
            }
            (true, None) => client.manager_uid = None,
            (false, Some(uid)) => {
                ensure_manager(&mut tx, uid).await?;
                client.manager_uid = Some(uid);
            }
            (false, None) => {}
        }
    }

    client.search_tokens = client_tokens(
        &client.name,
        client.email.as_deref(),
        client.code,
        client.document_number.as_deref(),
    );
    client.updated_at = shared::util::now_millis();

    let updated: Client = sqlx::query_as(&format!(
        r#"
        UPDATE clients SET
            name = $1, email = $2, phone = $3, country = $4, state = $5, city = $6,
            address = $7, postal_code = $8, document_type = $9, document_number = $10,
            manager_uid = $11, search_tokens = $12, updated_at = $13
        WHERE id = $14
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(&client.name)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.country)
    .bind(&client.state)
    .bind(&client.city)
    .bind(&client.address)
    .bind(&client.postal_code)
    .bind(&client.document_type)
    .bind(&client.document_number)
    .bind(client.manager_uid)
    .bind(&client.search_tokens)
    .bind(client.updated_at)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if updated.manager_uid != previous_manager {
        shipments::refresh_managers_for_client(&mut tx, id).await?;
        tracing::info!(
            client_id = id,
            from = ?previous_manager,
            to = ?updated.manager_uid,
            "Client manager changed"
        );
    }

    tx.commit().await?;
    Ok(updated)
}

/// A client may only be owned by an active partner admin.
async fn ensure_manager(conn: &mut PgConnection, uid: i64) -> ServiceResult<()> {
    let row: Option<(String, bool)> =
        sqlx::query_as("SELECT role, active FROM users WHERE id = $1")
            .bind(uid)
            .fetch_optional(conn)
            .await?;
    match row {
        Some((role, true)) if role == Role::PartnerAdmin.as_str() => Ok(()),
        _ => Err(AppError::new(ErrorCode::ClientInvalidManager)
            .with_detail("manager_uid", uid)
            .into()),
    }
}

pub async fn set_activo(pool: &PgPool, id: i64, activo: bool) -> ServiceResult<Client> {
    let client: Option<Client> = sqlx::query_as(&format!(
        "UPDATE clients SET activo = $1, updated_at = $2 WHERE id = $3 RETURNING {CLIENT_COLUMNS}"
    ))
    .bind(activo)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    client.ok_or_else(|| AppError::new(ErrorCode::ClientNotFound).into())
}

/// Delete a client that owns no boxes, packages or invoices. Its alerts go
/// with it and linked logins are disabled.
pub async fn delete(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id).await?;

    let (boxes, packages, invoices): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM boxes WHERE client_id = $1),
            (SELECT COUNT(*) FROM inbound_packages WHERE client_id = $1),
            (SELECT COUNT(*) FROM invoices WHERE client_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if boxes + packages + invoices > 0 {
        return Err(AppError::new(ErrorCode::ClientHasDependents)
            .with_detail("boxes", boxes)
            .with_detail("packages", packages)
            .with_detail("invoices", invoices)
            .into());
    }

    sqlx::query("DELETE FROM tracking_alerts WHERE client_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE users SET active = FALSE WHERE client_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(client_id = id, "Client deleted");
    Ok(())
}

/// Rebuild `search_tokens` for every client. Returns the number of rows.
pub async fn reindex_search_tokens(pool: &PgPool) -> ServiceResult<u64> {
    let rows: Vec<(i64, String, Option<String>, i64, Option<String>)> =
        sqlx::query_as("SELECT id, name, email, code, document_number FROM clients")
            .fetch_all(pool)
            .await?;

    let mut updated = 0;
    for (id, name, email, code, document_number) in rows {
        let tokens = client_tokens(&name, email.as_deref(), code, document_number.as_deref());
        updated += sqlx::query("UPDATE clients SET search_tokens = $1 WHERE id = $2")
            .bind(&tokens)
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
    }

    tracing::info!(updated, "Client search tokens rebuilt");
    Ok(updated)
}
