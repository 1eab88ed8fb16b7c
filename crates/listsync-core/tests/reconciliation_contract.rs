//! Contract Test: Reconciliation
//!
//! Verifies the registry-level validation pass: classification of missing,
//! orphaned, and size-mismatched containers, and orphan repair under
//! auto-fix.

mod common;

use common::*;
use listsync_core::traits::ContainerKind;
use listsync_core::{ContainerEngine, ValidationStatus};

fn engine_with(
    probe: &MockContainerService,
    cache: listsync_core::ValueCache,
) -> ContainerEngine {
    ContainerEngine::with_cache(
        Box::new(MockContainerService::sharing_counters_with(probe)),
        Some(cache),
    )
}

#[tokio::test]
async fn classifies_missing_orphaned_and_matching_containers() {
    let (_dir, cache) = temp_cache().await;

    // Registry knows B (size 3) and C (size 1)
    cache
        .upsert_container("b", &ContainerKind::Fqdn, Some(3))
        .await
        .unwrap();
    cache
        .upsert_container("c", &ContainerKind::Ip, Some(1))
        .await
        .unwrap();

    // Remote reports A (size 5) and B (size 3)
    let service = MockContainerService::new();
    service.set_listing(vec![
        info("a", ContainerKind::Ip, 5),
        info("b", ContainerKind::Fqdn, 3),
    ]);
    let engine = engine_with(&service, cache);

    let report = engine.validate(false).await.unwrap();

    assert_eq!(service.list_call_count(), 1, "one listing fetch per pass");
    assert_eq!(report.status, ValidationStatus::Fail);
    assert_eq!(report.remote_containers, 2);
    assert_eq!(report.cached_containers, 2);
    assert_eq!(report.missing_in_cache.len(), 1);
    assert_eq!(report.missing_in_cache[0].name, "a");
    assert_eq!(report.orphaned.len(), 1);
    assert_eq!(report.orphaned[0].name, "c");
    assert!(report.size_mismatches.is_empty(), "b matches on both sides");
    assert_eq!(report.validated, 1);
}

#[tokio::test]
async fn size_mismatch_carries_signed_difference() {
    let (_dir, cache) = temp_cache().await;
    cache
        .upsert_container("edge", &ContainerKind::Ip, Some(10))
        .await
        .unwrap();

    let service = MockContainerService::new();
    service.set_listing(vec![info("edge", ContainerKind::Ip, 7)]);
    let engine = engine_with(&service, cache);

    let report = engine.validate(false).await.unwrap();

    assert_eq!(report.status, ValidationStatus::Fail);
    assert_eq!(report.size_mismatches.len(), 1);
    assert_eq!(report.size_mismatches[0].remote_size, 7);
    assert_eq!(report.size_mismatches[0].cached_size, 10);
    assert_eq!(report.size_mismatches[0].difference, -3);
}

#[tokio::test]
async fn matching_sides_pass() {
    let (_dir, cache) = temp_cache().await;
    cache
        .upsert_container("edge", &ContainerKind::Ip, Some(4))
        .await
        .unwrap();

    let service = MockContainerService::new();
    service.set_listing(vec![info("edge", ContainerKind::Ip, 4)]);
    let engine = engine_with(&service, cache);

    let report = engine.validate(false).await.unwrap();
    assert!(report.passed());
    assert!(report.repaired.is_empty());
}

#[tokio::test]
async fn auto_fix_clears_orphaned_cache_state() {
    let (_dir, cache) = temp_cache().await;

    // "gone" was deleted remotely out-of-band; its entries linger locally
    cache
        .upsert_container("gone", &ContainerKind::Ip, Some(2))
        .await
        .unwrap();
    cache
        .upsert_ip_range("gone", &range("10.0.0.1", "10.0.0.2"))
        .await
        .unwrap();
    cache
        .upsert_container("kept", &ContainerKind::Fqdn, Some(1))
        .await
        .unwrap();

    let service = MockContainerService::new();
    service.set_listing(vec![info("kept", ContainerKind::Fqdn, 1)]);
    let engine = engine_with(&service, cache);

    let report = engine.validate(true).await.unwrap();

    // Status reflects what was found, not what was fixed
    assert_eq!(report.status, ValidationStatus::Fail);
    assert_eq!(report.repaired, vec!["gone".to_string()]);
    assert!(report.fix_failures.is_empty());

    let cache = engine.cache().unwrap();
    assert!(cache.container_record("gone").await.unwrap().is_none());
    assert!(cache.ip_ranges("gone").await.unwrap().is_empty());
    assert!(cache.container_record("kept").await.unwrap().is_some());

    // A second pass no longer sees the orphan
    let report = engine.validate(false).await.unwrap();
    assert!(report.orphaned.is_empty());
}

#[tokio::test]
async fn validate_without_auto_fix_leaves_orphans_alone() {
    let (_dir, cache) = temp_cache().await;
    cache
        .upsert_container("gone", &ContainerKind::Ip, Some(2))
        .await
        .unwrap();

    let service = MockContainerService::new();
    let engine = engine_with(&service, cache);

    let report = engine.validate(false).await.unwrap();
    assert_eq!(report.orphaned.len(), 1);
    assert!(report.repaired.is_empty());
    assert!(
        engine
            .cache()
            .unwrap()
            .container_record("gone")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn entries_without_registry_metadata_are_invisible_to_validation() {
    // Metadata is best-effort: entries can exist without a registry row,
    // and validation only sees the registry
    let (_dir, cache) = temp_cache().await;
    cache
        .upsert_fqdn("untracked", "a.example.com")
        .await
        .unwrap();

    let service = MockContainerService::new();
    let engine = engine_with(&service, cache);

    let report = engine.validate(false).await.unwrap();
    assert!(report.passed());
    assert_eq!(report.cached_containers, 0);
}
