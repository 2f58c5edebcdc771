//! Contract tests for CloudProvider.
//!
//! These tests pin down the behaviour rotation logic relies on, using the
//! in-memory fake. Any conforming backend must behave the same way.

use autosnap_provider::fakes::{MemoryCloud, ProviderCall, ProviderOp};
use autosnap_provider::*;

fn seeded() -> MemoryCloud {
    let cloud = MemoryCloud::new();
    cloud.add_instance(
        "i-1",
        Tags::new().with("Name", "web1").with_flag("ToSnap", true),
    );
    cloud.add_instance("i-2", Tags::new().with("ToSnap", "False"));
    cloud.add_instance("i-3", Tags::new().with("Name", "db1"));
    cloud.add_volume("vol-1", Some("i-1"));
    cloud.add_volume("vol-2", None);
    cloud
}

// ===========================================================================
// Listing
// ===========================================================================

#[tokio::test]
async fn list_instances_key_presence_ignores_value() {
    let cloud = seeded();
    let found = cloud
        .list_instances(&TagFilter::key_present("ToSnap"))
        .await
        .unwrap();

    let ids: Vec<&str> = found.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["i-1", "i-2"]);
}

#[tokio::test]
async fn list_instances_exact_value() {
    let cloud = seeded();
    let found = cloud
        .list_instances(&TagFilter::equals("ToSnap", FLAG_TRUE))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), Some("web1"));
}

#[tokio::test]
async fn list_volumes_returns_attached_and_detached() {
    let cloud = seeded();
    let volumes = cloud.list_volumes().await.unwrap();

    assert_eq!(volumes.len(), 2);
    assert_eq!(volumes[0].attached_to, Some(InstanceId::new("i-1")));
    assert_eq!(volumes[1].attached_to, None);
}

// ===========================================================================
// Create + tag
// ===========================================================================

#[tokio::test]
async fn create_then_tag_round_trip() {
    let cloud = seeded();
    let snap = cloud
        .create_snapshot(&VolumeId::new("vol-1"), "Auto web1 2024-06-15 Snapshot", false)
        .await
        .unwrap()
        .expect("snapshot handle");

    let tags = Tags::new()
        .with(NAME_TAG, "auto-web1-2024-06-15-snapshot")
        .with_flag("AutoSnapshot", true)
        .with(DATE_TAG, "2024-06-15");
    cloud.set_tags(snap.id.as_str(), &tags).await.unwrap();

    let listed = cloud
        .list_snapshots(&TagFilter::key_present("AutoSnapshot"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, snap.id);
    assert_eq!(listed[0].tags, tags);
    assert_eq!(listed[0].description, "Auto web1 2024-06-15 Snapshot");
}

#[tokio::test]
async fn create_dry_run_returns_no_handle() {
    let cloud = seeded();
    let handle = cloud
        .create_snapshot(&VolumeId::new("vol-1"), "dry", true)
        .await
        .unwrap();

    assert!(handle.is_none());
    assert!(cloud.snapshots().is_empty());
    assert_eq!(cloud.calls_to(ProviderOp::CreateSnapshot).len(), 1);
}

#[tokio::test]
async fn create_unknown_volume_fails() {
    let cloud = seeded();
    let err = cloud
        .create_snapshot(&VolumeId::new("vol-404"), "x", false)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotFound { kind: "volume", .. }));
}

#[tokio::test]
async fn set_tags_unknown_resource_fails() {
    let cloud = seeded();
    let err = cloud
        .set_tags("snap-missing", &Tags::new().with("A", "B"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotFound { .. }));
}

// ===========================================================================
// Delete
// ===========================================================================

#[tokio::test]
async fn delete_removes_snapshot() {
    let cloud = seeded();
    cloud.add_snapshot("snap-1", "vol-1", Tags::new().with_flag("AutoSnapshot", true));

    cloud
        .delete_snapshot(&SnapshotId::new("snap-1"), false)
        .await
        .unwrap();

    assert!(cloud.snapshot(&SnapshotId::new("snap-1")).is_none());
}

#[tokio::test]
async fn delete_dry_run_keeps_snapshot() {
    let cloud = seeded();
    cloud.add_snapshot("snap-1", "vol-1", Tags::new());

    cloud
        .delete_snapshot(&SnapshotId::new("snap-1"), true)
        .await
        .unwrap();

    assert!(cloud.snapshot(&SnapshotId::new("snap-1")).is_some());
    assert_eq!(
        cloud.calls_to(ProviderOp::DeleteSnapshot),
        vec![ProviderCall::DeleteSnapshot {
            snapshot_id: SnapshotId::new("snap-1"),
            dry_run: true,
        }]
    );
}

#[tokio::test]
async fn delete_missing_snapshot_fails() {
    let cloud = seeded();
    let err = cloud
        .delete_snapshot(&SnapshotId::new("snap-404"), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotFound { kind: "snapshot", .. }));
}

#[tokio::test]
async fn call_log_preserves_order() {
    let cloud = seeded();
    cloud
        .list_instances(&TagFilter::key_present("ToSnap"))
        .await
        .unwrap();
    cloud.list_volumes().await.unwrap();

    let ops: Vec<ProviderOp> = cloud.calls().iter().map(ProviderCall::op).collect();
    assert_eq!(ops, vec![ProviderOp::ListInstances, ProviderOp::ListVolumes]);
}
