//! Shared fixtures for database-backed tests
//!
//! Tests run against `TEST_DATABASE_URL` and return early when it is unset.
//! Every fixture uses fresh snowflake-based names so tests can share one
//! database and run in parallel.

#![allow(dead_code)]

use portal_server::error::ServiceError;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    BoxCreate, BoxType, Client, ClientCreate, InboundPackage, PackageCreate, ShippingBox,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub async fn pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(24)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}{}", shared::util::snowflake_id())
}

pub fn code_of(err: ServiceError) -> ErrorCode {
    AppError::from(err).code
}

pub fn client_payload(country: &str) -> ClientCreate {
    ClientCreate {
        name: unique("Cliente "),
        email: None,
        phone: None,
        country: country.to_string(),
        state: None,
        city: None,
        address: None,
        postal_code: None,
        document_type: None,
        document_number: None,
        manager_uid: None,
        password: None,
    }
}

pub async fn client(pool: &PgPool, country: &str) -> Client {
    portal_server::db::clients::create(pool, &client_payload(country), None, None)
        .await
        .expect("create client")
}

pub async fn package(pool: &PgPool, client_id: i64, weight_lb: Decimal) -> InboundPackage {
    receive(pool, client_id, &unique("TRK"), weight_lb).await
}

pub async fn receive(
    pool: &PgPool,
    client_id: i64,
    tracking: &str,
    weight_lb: Decimal,
) -> InboundPackage {
    let data = PackageCreate {
        tracking: tracking.to_string(),
        carrier: Some("UPS".into()),
        client_id,
        weight_lb,
        photo_url: None,
        notes: None,
    };
    portal_server::db::packages::receive(pool, &data)
        .await
        .expect("receive package")
        .package
}

pub async fn open_box(pool: &PgPool, client_id: i64, box_type: BoxType) -> ShippingBox {
    portal_server::db::boxes::create(pool, &BoxCreate { client_id, box_type })
        .await
        .expect("create box")
}

/// A closed box holding one fresh package
pub async fn closed_box(pool: &PgPool, client_id: i64, box_type: BoxType) -> ShippingBox {
    let b = open_box(pool, client_id, box_type).await;
    let p = package(pool, client_id, Decimal::ONE).await;
    portal_server::db::boxes::add_items(pool, b.id, &[p.id])
        .await
        .expect("add item");
    portal_server::db::boxes::close(pool, b.id)
        .await
        .expect("close box")
}
