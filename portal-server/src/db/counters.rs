//! Sequential display codes
//!
//! `counters` holds one row per sequence. The upsert takes the row lock, so
//! concurrent callers are serialised and each committed transaction gets a
//! distinct value. A value taken by a rolled-back transaction is released
//! with it.

use sqlx::PgConnection;

pub const CLIENTS: &str = "clients";
pub const BOXES: &str = "boxes";
pub const SHIPMENTS: &str = "shipments";
pub const INVOICES: &str = "invoices";

/// Next value of a sequence, inside the caller's transaction.
pub async fn next_value(conn: &mut PgConnection, name: &str) -> Result<i64, sqlx::Error> {
    let (value,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO counters (name, value) VALUES ($1, 1)
        ON CONFLICT (name) DO UPDATE SET value = counters.value + 1
        RETURNING value
        "#,
    )
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(value)
}
