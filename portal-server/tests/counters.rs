//! Sequential codes under concurrent creation

mod common;

use std::collections::HashSet;

use futures::future::join_all;
use portal_server::db;
use shared::models::BoxType;

const CONCURRENCY: usize = 32;

#[tokio::test]
async fn concurrent_client_creation_yields_unique_codes() {
    let Some(pool) = common::pool().await else {
        return;
    };

    let payloads: Vec<_> = (0..CONCURRENCY).map(|_| common::client_payload("VE")).collect();
    let results = join_all(
        payloads
            .iter()
            .map(|p| db::clients::create(&pool, p, None, None)),
    )
    .await;

    let codes: HashSet<i64> = results
        .into_iter()
        .map(|r| r.expect("create client").code)
        .collect();
    assert_eq!(codes.len(), CONCURRENCY);
}

#[tokio::test]
async fn concurrent_box_creation_yields_unique_codes() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;

    let tasks = (0..CONCURRENCY).map(|i| {
        let pool = pool.clone();
        let box_type = if i % 2 == 0 { BoxType::Comercial } else { BoxType::Franquicia };
        tokio::spawn(async move { common::open_box(&pool, client.id, box_type).await.code })
    });
    let codes: HashSet<i64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task"))
        .collect();
    assert_eq!(codes.len(), CONCURRENCY);
}
