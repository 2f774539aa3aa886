#![allow(dead_code)]

use chrono::{TimeDelta, Utc};
use pickup_point::domain::order::{Order, Status};
use pickup_point::domain::packaging::PackageKind;
use pickup_point::domain::ports::OrderStorage;
use pickup_point::error::OrderError;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;

pub fn order(cost: u64) -> Order {
    Order {
        expiration_date: (Utc::now() + TimeDelta::days(7)).date_naive(),
        package: PackageKind::Package,
        weight: 402,
        cost,
        use_tape: true,
    }
}

fn ids(views: &[pickup_point::domain::order::OrderView]) -> Vec<u64> {
    views.iter().map(|v| v.order_id).collect()
}

/// Accept followed by a status read returns `accepted` and the same order value.
pub async fn check_accept_round_trip(storage: &dyn OrderStorage, base: u64) {
    let at = Utc::now();
    storage.add_order(base, base + 1, order(1408), at).await.unwrap();

    let record = storage.get_order_status(base + 1).await.unwrap();
    assert_eq!(record.status, Status::Accepted);
    assert_eq!(record.user_id, base);
    assert_eq!(record.order, order(1408));
    assert_eq!(storage.get_order(base, base + 1).await.unwrap(), order(1408));
    assert_eq!(
        storage.get_expiration_date(base, base + 1).await.unwrap(),
        order(1408).expiration_date
    );
}

/// A second accept of the same id fails whichever user asks.
pub async fn check_duplicate_accept(storage: &dyn OrderStorage, base: u64) {
    let at = Utc::now();
    storage.add_order(base, base + 1, order(10), at).await.unwrap();

    for user_id in [base, base + 50] {
        assert!(matches!(
            storage.add_order(user_id, base + 1, order(20), at).await,
            Err(OrderError::AlreadyExist(_))
        ));
    }
    assert_eq!(
        storage.get_order_status(base + 1).await.unwrap().order,
        order(10)
    );
}

/// One unknown id in a batch leaves every other order untouched.
pub async fn check_remove_orders_all_or_nothing(storage: &dyn OrderStorage, base: u64) {
    let at = Utc::now();
    for id in 1..=3 {
        storage.add_order(base, base + id, order(10), at).await.unwrap();
    }

    let result = storage
        .remove_orders(&[base + 1, base + 2, base + 99, base + 3], Status::IssuedToClient, at)
        .await;
    match result {
        Err(OrderError::NotFound(message)) => {
            assert!(message.contains(&(base + 99).to_string()))
        }
        other => panic!("unexpected result: {other:?}"),
    }
    for id in 1..=3 {
        let record = storage.get_order_status(base + id).await.unwrap();
        assert_eq!(record.status, Status::Accepted);
    }

    storage
        .remove_orders(&[base + 1, base + 2, base + 1], Status::IssuedToClient, at)
        .await
        .unwrap();
    for id in [1, 2] {
        let record = storage.get_order_status(base + id).await.unwrap();
        assert_eq!(record.status, Status::IssuedToClient);
    }
    assert!(matches!(
        storage.can_remove_order(base + 1).await,
        Err(OrderError::WrongStatus(_))
    ));
    storage.can_remove_order(base + 3).await.unwrap();
    assert_eq!(
        ids(&storage.get_orders_by_user(base, 0, 0).await.unwrap()),
        vec![base + 3]
    );
}

/// Status rewrites stamp the given time.
pub async fn check_set_status_stamps_time(storage: &dyn OrderStorage, base: u64) {
    let accepted_at = Utc::now() - TimeDelta::hours(5);
    storage
        .add_order(base, base + 1, order(10), accepted_at)
        .await
        .unwrap();

    let later = accepted_at + TimeDelta::hours(3);
    storage
        .set_order_status(base + 1, Status::IssuedToCourier, later)
        .await
        .unwrap();
    let record = storage.get_order_status(base + 1).await.unwrap();
    assert_eq!(record.status, Status::IssuedToCourier);
    assert_eq!(record.updated_at.timestamp(), later.timestamp());

    assert!(matches!(
        storage
            .set_order_status(base + 2, Status::Returned, later)
            .await,
        Err(OrderError::NotFound(_))
    ));
}

/// Refund queue membership follows the `returned` status exactly.
pub async fn check_refund_cycle(storage: &dyn OrderStorage, base: u64) {
    let at = Utc::now();
    storage.add_order(base, base + 1, order(10), at).await.unwrap();

    assert!(matches!(
        storage.add_refund(base, base + 1, order(10), at).await,
        Err(OrderError::WrongStatus(_))
    ));

    storage
        .remove_order(base + 1, Status::IssuedToClient, at)
        .await
        .unwrap();
    assert!(matches!(
        storage.add_refund(base + 7, base + 1, order(10), at).await,
        Err(OrderError::WrongInput(_))
    ));
    storage.add_refund(base, base + 1, order(10), at).await.unwrap();
    assert_eq!(
        storage.get_order_status(base + 1).await.unwrap().status,
        Status::Returned
    );
    let queued = storage.get_refunds(1, u32::MAX.into()).await.unwrap();
    assert!(ids(&queued).contains(&(base + 1)));

    storage.remove_refund(base + 1, at).await.unwrap();
    assert_eq!(
        storage.get_order_status(base + 1).await.unwrap().status,
        Status::IssuedToCourier
    );
    let queued = storage.get_refunds(1, u32::MAX.into()).await.unwrap();
    assert!(!ids(&queued).contains(&(base + 1)));

    assert!(matches!(
        storage.remove_refund(base + 1, at).await,
        Err(OrderError::WrongStatus(_))
    ));
    assert!(matches!(
        storage.get_refunds(0, 10).await,
        Err(OrderError::WrongInput(_))
    ));
    assert!(matches!(
        storage.get_refunds(1, 0).await,
        Err(OrderError::WrongInput(_))
    ));
}

/// Removing an already-yielded entry while the next page is read neither repeats nor skips any
/// other live entry.
pub async fn check_pagination_stable_under_tombstoning(storage: Arc<dyn OrderStorage>, base: u64) {
    let at = Utc::now();
    let user_id = base;
    for id in 1..=6 {
        storage.add_order(user_id, base + id, order(10), at).await.unwrap();
    }

    let first = storage.get_orders_by_user(user_id, 0, 3).await.unwrap();
    assert_eq!(ids(&first), vec![base + 1, base + 2, base + 3]);

    let remover = {
        let storage = storage.clone();
        tokio::spawn(async move {
            storage
                .remove_orders(&[base + 2], Status::IssuedToClient, Utc::now())
                .await
        })
    };
    let reader = {
        let storage = storage.clone();
        tokio::spawn(async move { storage.get_orders_by_user(user_id, base + 4, 3).await })
    };
    let (removed, second) = tokio::join!(remover, reader);
    removed.unwrap().unwrap();
    assert_eq!(ids(&second.unwrap().unwrap()), vec![base + 4, base + 5, base + 6]);

    // A tombstoned id still marks its position.
    let resumed = storage
        .get_orders_by_user(user_id, base + 2, 2)
        .await
        .unwrap();
    assert_eq!(ids(&resumed), vec![base + 3, base + 4]);

    assert!(matches!(
        storage.get_orders_by_user(user_id, base + 42, 3).await,
        Err(OrderError::NotFound(_))
    ));
    assert!(matches!(
        storage.get_orders_by_user(base + 1000, 0, 3).await,
        Err(OrderError::NotFound(_))
    ));
}

/// Overlapping batches race to issue the same orders. Every order ends up issued by at most one
/// batch, and the winning batches are pairwise disjoint. Returns how many batches won.
pub async fn check_concurrent_batches_never_double_issue(
    storage: Arc<dyn OrderStorage>,
    base: u64,
) -> usize {
    let at = Utc::now();
    let order_ids: Vec<u64> = (1..=12).map(|id| base + id).collect();
    for &id in &order_ids {
        storage.add_order(base, id, order(10), at).await.unwrap();
    }

    let batches: Vec<Vec<u64>> = {
        let mut rng = rand::thread_rng();
        (0..16)
            .map(|_| {
                let mut batch: Vec<u64> =
                    order_ids.choose_multiple(&mut rng, 3).copied().collect();
                batch.shuffle(&mut rng);
                batch
            })
            .collect()
    };

    let mut handles = Vec::new();
    for batch in batches {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let result = storage
                .remove_orders(&batch, Status::IssuedToClient, Utc::now())
                .await;
            (batch, result)
        }));
    }

    let mut issued = HashSet::new();
    let mut winners = 0;
    for handle in handles {
        let (batch, result) = handle.await.unwrap();
        if result.is_ok() {
            winners += 1;
            for id in batch {
                assert!(issued.insert(id), "order {id} was issued twice");
            }
        }
    }

    for &id in &order_ids {
        let status = storage.get_order_status(id).await.unwrap().status;
        assert_eq!(
            status == Status::IssuedToClient,
            issued.contains(&id),
            "order {id} has status {status}"
        );
    }
    winners
}
