mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use shortlink::domain::reconciler::{Reconciler, ReconcilerConfig};
use shortlink::domain::repositories::{KeyStore, ObjectClient};
use shortlink::infrastructure::keystore::MemoryKeyStore;
use shortlink::infrastructure::storage::ObjectStorage;
use shortlink::utils::object_name::ObjectUrlPolicy;
use url::Url;

fn fixture() -> (Arc<MemoryKeyStore>, Arc<ObjectStorage>) {
    let endpoint = Url::parse(common::S3_ENDPOINT).unwrap();
    let policy = ObjectUrlPolicy::new(&endpoint, common::S3_BUCKET);
    let store = Arc::new(MemoryKeyStore::new(
        Duration::from_secs(1800),
        Some(policy),
    ));
    let storage = Arc::new(ObjectStorage::memory_with_endpoint(
        &endpoint,
        common::S3_BUCKET,
    ));
    (store, storage)
}

fn reconciler(
    store: &Arc<MemoryKeyStore>,
    storage: &Arc<ObjectStorage>,
    grace: Duration,
) -> Reconciler {
    Reconciler::new(
        store.clone(),
        storage.clone(),
        ReconcilerConfig {
            interval: Duration::from_secs(300),
            grace_window: grace,
            pass_timeout: Duration::from_secs(30),
        },
    )
}

async fn put(storage: &ObjectStorage, name: &str) {
    storage
        .put(name, Bytes::from_static(b"payload"), None)
        .await
        .unwrap();
    // Grace comparisons are strict; give the object a measurable age.
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn test_pass_spares_referenced_object() {
    let (store, storage) = fixture();
    store
        .set("keep", &common::object_url("keep.bin"), None, true)
        .await
        .unwrap();
    put(&storage, "keep.bin").await;

    let summary = reconciler(&store, &storage, Duration::ZERO)
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.live_references, 1);
    assert_eq!(summary.entries_checked, 1);
    assert_eq!(summary.entries_removed, 0);
    assert_eq!(summary.objects_deleted, 0);
    assert!(storage.stat_exists("keep.bin").await.unwrap());
}

/// The live set is built fresh from token targets, so a referenced object
/// survives even when its cache entry has gone missing.
#[tokio::test]
async fn test_pass_spares_referenced_object_with_missing_cache_entry() {
    let (store, storage) = fixture();
    store
        .set("keep", &common::object_url("keep.bin"), None, true)
        .await
        .unwrap();
    store.remove_cache_entry("keep").await.unwrap();
    put(&storage, "keep.bin").await;

    let summary = reconciler(&store, &storage, Duration::ZERO)
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.live_references, 1);
    assert_eq!(summary.entries_checked, 0);
    assert_eq!(summary.objects_deleted, 0);
    assert!(storage.stat_exists("keep.bin").await.unwrap());
}

#[tokio::test]
async fn test_pass_reaps_orphaned_object() {
    let (store, storage) = fixture();
    put(&storage, "orphan.bin").await;

    let summary = reconciler(&store, &storage, Duration::ZERO)
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.live_references, 0);
    assert_eq!(summary.objects_deleted, 1);
    assert_eq!(summary.skipped_grace, 0);
    assert!(!storage.stat_exists("orphan.bin").await.unwrap());
}

/// An unreferenced object younger than the grace window stays, so an
/// upload whose token write is still in flight is never reaped.
#[tokio::test]
async fn test_pass_grace_window_spares_fresh_object() {
    let (store, storage) = fixture();
    put(&storage, "fresh.bin").await;

    let summary = reconciler(&store, &storage, Duration::from_secs(3600))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.skipped_grace, 1);
    assert_eq!(summary.objects_deleted, 0);
    assert!(storage.stat_exists("fresh.bin").await.unwrap());
}

/// A cache entry outliving its token marks the object for deletion well
/// before the bucket sweep would consider it: the grace window here is an
/// hour, so only the cache sweep can have removed it.
#[tokio::test]
async fn test_pass_reaps_object_of_expired_token() {
    let (store, storage) = fixture();

    // Object-backed write records the cache entry with a long deadline.
    store
        .set(
            "stale",
            &common::object_url("stale.bin"),
            Some(Duration::from_secs(3600)),
            true,
        )
        .await
        .unwrap();
    // Rewriting to a plain target leaves that entry in place; the short
    // TTL then kills the token itself.
    store
        .set(
            "stale",
            "https://example.com/elsewhere",
            Some(Duration::from_millis(30)),
            false,
        )
        .await
        .unwrap();
    put(&storage, "stale.bin").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!store.exists("stale").await.unwrap());

    let summary = reconciler(&store, &storage, Duration::from_secs(3600))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.entries_checked, 1);
    assert_eq!(summary.entries_removed, 1);
    assert_eq!(summary.objects_deleted, 1);
    assert_eq!(summary.skipped_grace, 0);
    assert!(!storage.stat_exists("stale.bin").await.unwrap());
}

/// Deleting a token removes its store records immediately; the object it
/// pointed at becomes an orphan for the next pass to collect.
#[tokio::test]
async fn test_pass_reaps_object_after_token_delete() {
    let (store, storage) = fixture();
    store
        .set("gone", &common::object_url("gone.bin"), None, true)
        .await
        .unwrap();
    put(&storage, "gone.bin").await;
    store.delete("gone").await.unwrap();

    let summary = reconciler(&store, &storage, Duration::ZERO)
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.live_references, 0);
    assert_eq!(summary.entries_checked, 0);
    assert_eq!(summary.objects_deleted, 1);
    assert!(!storage.stat_exists("gone.bin").await.unwrap());
}

/// When the bucket sweep deletes an object, entries still naming it are
/// purged even though their tokens are alive and point elsewhere.
#[tokio::test]
async fn test_pass_purges_stray_entries_for_deleted_object() {
    let (store, storage) = fixture();

    store
        .set("mover", &common::object_url("a.bin"), None, true)
        .await
        .unwrap();
    store
        .set("mover", "https://example.com", None, false)
        .await
        .unwrap();
    put(&storage, "a.bin").await;

    let summary = reconciler(&store, &storage, Duration::ZERO)
        .run_pass()
        .await
        .unwrap();

    assert_eq!(summary.live_references, 0);
    assert_eq!(summary.objects_deleted, 1);
    assert_eq!(summary.entries_removed, 1);
    assert!(!storage.stat_exists("a.bin").await.unwrap());
    assert!(store.cache_entries().await.unwrap().is_empty());
    // The token itself is untouched.
    assert!(store.exists("mover").await.unwrap());
}

#[tokio::test]
async fn test_pass_second_run_is_quiet() {
    let (store, storage) = fixture();
    store
        .set("keep", &common::object_url("keep.bin"), None, true)
        .await
        .unwrap();
    put(&storage, "keep.bin").await;
    put(&storage, "orphan.bin").await;

    let reconciler = reconciler(&store, &storage, Duration::ZERO);
    reconciler.run_pass().await.unwrap();

    let summary = reconciler.run_pass().await.unwrap();
    assert_eq!(summary.objects_deleted, 0);
    assert_eq!(summary.entries_removed, 0);
    assert_eq!(summary.errors, 0);
    assert!(storage.stat_exists("keep.bin").await.unwrap());
}
