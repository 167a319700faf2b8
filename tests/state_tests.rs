use std::sync::Arc;

use sumsq::state::NumberSet;

#[tokio::test]
async fn test_insert_and_aggregate() {
    let set = NumberSet::new();

    assert_eq!(set.insert_and_aggregate(3).await, 9);
    assert_eq!(set.insert_and_aggregate(4).await, 25);
    assert_eq!(set.insert_and_aggregate(-4).await, 41);
}

#[tokio::test]
async fn test_duplicate_insert_changes_nothing() {
    let set = NumberSet::new();

    assert!(set.insert(5).await);
    assert_eq!(set.aggregate().await, 25);

    assert!(!set.insert(5).await);
    assert_eq!(set.aggregate().await, 25);
    assert_eq!(set.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_inserts_with_duplicates() {
    let set = Arc::new(NumberSet::new());

    // 8 tasks all racing over the same value range; duplicates must
    // not be double counted no matter how the inserts interleave
    let mut tasks = Vec::new();
    for task in 0..8 {
        let set = Arc::clone(&set);
        tasks.push(tokio::spawn(async move {
            for n in 0..100i64 {
                set.insert_and_aggregate(n + (task % 2)).await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let expected = (0..101i64).map(|n| n * n).sum::<i64>();
    assert_eq!(set.aggregate().await, expected);
    assert_eq!(set.len().await, 101);
}

#[tokio::test]
async fn test_snapshot_is_consistent_under_concurrent_inserts() {
    let set = Arc::new(NumberSet::new());

    let writer = {
        let set = Arc::clone(&set);
        tokio::spawn(async move {
            for n in 0..500i64 {
                set.insert(n).await;
            }
        })
    };

    // every snapshot must hold a prefix-consistent element count:
    // distinct values only, nothing half-inserted
    for _ in 0..50 {
        let snapshot = set.snapshot().await;
        let mut sorted = snapshot.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), snapshot.len(), "snapshot held duplicates");
        assert!(snapshot.len() <= 500);
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    assert_eq!(set.snapshot().await.len(), 500);
}

#[tokio::test]
async fn test_snapshot_sees_completed_inserts() {
    let set = NumberSet::new();
    for n in [3, -1, 7] {
        set.insert(n).await;
    }

    let mut snapshot = set.snapshot().await;
    snapshot.sort_unstable();
    assert_eq!(snapshot, vec![-1, 3, 7]);
}
