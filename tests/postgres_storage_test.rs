#![cfg(feature = "storage-postgres")]

mod common;

use pickup_point::domain::ports::OrderStorage;
use pickup_point::infrastructure::postgres::PostgresStorage;
use std::sync::Arc;

/// Connects to `DATABASE_URL`, or returns `None` so the test can skip itself.
async fn storage() -> Option<PostgresStorage> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set, skipping postgres tests");
        return None;
    };
    let storage = PostgresStorage::connect(&url).await.unwrap();
    storage.migrate().await.unwrap();
    Some(storage)
}

/// Ids unique to this run so repeated runs against one database don't collide.
fn base() -> u64 {
    u64::from(rand::random::<u32>() >> 4) * 10_000
}

#[tokio::test]
async fn test_postgres_storage_contract() {
    let Some(storage) = storage().await else {
        return;
    };

    common::check_accept_round_trip(&storage, base()).await;
    common::check_duplicate_accept(&storage, base()).await;
    common::check_remove_orders_all_or_nothing(&storage, base()).await;
    common::check_set_status_stamps_time(&storage, base()).await;
    common::check_refund_cycle(&storage, base()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_pagination_stable_under_tombstoning() {
    let Some(storage) = storage().await else {
        return;
    };

    let storage: Arc<dyn OrderStorage> = Arc::new(storage);
    common::check_pagination_stable_under_tombstoning(storage, base()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_concurrent_batches_never_double_issue() {
    let Some(storage) = storage().await else {
        return;
    };

    // Serialization failures may reject every contender; a double issue is what must not happen.
    let storage: Arc<dyn OrderStorage> = Arc::new(storage);
    common::check_concurrent_batches_never_double_issue(storage, base()).await;
}

#[tokio::test]
async fn test_postgres_migrate_is_idempotent() {
    let Some(storage) = storage().await else {
        return;
    };
    storage.migrate().await.unwrap();
}
