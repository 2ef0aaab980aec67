//! Contract tests for `LockManager` as a standalone component — atomic
//! multi-bin acquisition, ownership-scoped release, TTL expiry, and the
//! `validate` gate put-away paths consult.

use bin_allocation_engine::error::EngineError;
use bin_allocation_engine::services::LockManager;
use bin_allocation_engine::utils::clock::TestClock;
use bin_allocation_engine::utils::Clock;
use chrono::{Duration, Utc};
use std::sync::Arc;

fn manager_with_clock() -> (Arc<LockManager>, Arc<TestClock>) {
    let clock = Arc::new(TestClock::new(Utc::now()));
    let manager = Arc::new(LockManager::with_clock(600, clock.clone() as Arc<dyn Clock>));
    (manager, clock)
}

#[tokio::test]
async fn acquire_over_a_bin_set_is_all_or_nothing() {
    let (manager, _clock) = manager_with_clock();
    let warehouse = "WH1".to_string();

    manager
        .acquire(&warehouse, &["B1".to_string()], "op-a")
        .await
        .unwrap();

    let result = manager
        .acquire(&warehouse, &["B1".to_string(), "B2".to_string()], "op-b")
        .await;

    assert!(matches!(result, Err(EngineError::LockConflict { .. })));
    assert!(!manager.is_locked(&warehouse, &["B2".to_string()]).locked);
}

#[tokio::test]
async fn owning_operation_can_extend_its_own_lock_set() {
    let (manager, _clock) = manager_with_clock();
    let warehouse = "WH1".to_string();

    manager
        .acquire(&warehouse, &["B1".to_string()], "op-a")
        .await
        .unwrap();
    manager
        .acquire(&warehouse, &["B1".to_string(), "B2".to_string()], "op-a")
        .await
        .unwrap();

    let status = manager.is_locked(&warehouse, &["B1".to_string(), "B2".to_string()]);
    assert!(status.locked);
    assert_eq!(status.owner.as_deref(), Some("op-a"));
    assert_eq!(status.locks.len(), 2);
    assert!(status.locks.iter().all(|lock| lock.operation_id == "op-a"));
}

#[tokio::test]
async fn locks_auto_expire_after_ttl_and_become_acquirable_by_others() {
    let (manager, clock) = manager_with_clock();
    let warehouse = "WH1".to_string();

    manager
        .acquire(&warehouse, &["B1".to_string()], "op-a")
        .await
        .unwrap();
    assert!(manager.is_locked(&warehouse, &["B1".to_string()]).locked);

    clock.advance(Duration::minutes(10));
    assert!(!manager.is_locked(&warehouse, &["B1".to_string()]).locked);

    manager
        .acquire(&warehouse, &["B1".to_string()], "op-b")
        .await
        .unwrap();
    let status = manager.is_locked(&warehouse, &["B1".to_string()]);
    assert_eq!(status.owner.as_deref(), Some("op-b"));
}

#[tokio::test]
async fn validate_rejects_a_mutation_from_a_non_owning_operation() {
    let (manager, _clock) = manager_with_clock();
    let warehouse = "WH1".to_string();
    manager
        .acquire(&warehouse, &["B1".to_string()], "pick-op")
        .await
        .unwrap();

    let violation = manager.validate(&warehouse, &["B1".to_string()], None);
    assert!(matches!(violation, Err(EngineError::LockViolation { .. })));

    assert!(manager
        .validate(&warehouse, &["B1".to_string()], Some("pick-op"))
        .is_ok());
}

#[tokio::test]
async fn release_only_clears_locks_owned_by_the_caller() {
    let (manager, _clock) = manager_with_clock();
    let warehouse = "WH1".to_string();
    manager
        .acquire(&warehouse, &["B1".to_string(), "B2".to_string()], "op-a")
        .await
        .unwrap();

    manager
        .release(&warehouse, &["B1".to_string()], "op-b")
        .await;
    assert!(manager.is_locked(&warehouse, &["B1".to_string()]).locked);

    manager
        .release(&warehouse, &["B1".to_string()], "op-a")
        .await;
    assert!(!manager.is_locked(&warehouse, &["B1".to_string()]).locked);
    assert!(manager.is_locked(&warehouse, &["B2".to_string()]).locked);
}

#[tokio::test]
async fn force_release_all_clears_every_lock_in_the_warehouse_regardless_of_owner() {
    let (manager, _clock) = manager_with_clock();
    let warehouse = "WH1".to_string();
    manager
        .acquire(&warehouse, &["B1".to_string()], "op-a")
        .await
        .unwrap();
    manager
        .acquire(&warehouse, &["B2".to_string()], "op-b")
        .await
        .unwrap();

    manager.force_release_all(&warehouse).await;

    assert!(!manager.is_locked(&warehouse, &["B1".to_string(), "B2".to_string()]).locked);
}
