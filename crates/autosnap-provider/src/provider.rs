//! Provider trait definition for autosnap
//!
//! `CloudProvider` is the whole call surface autosnap needs from a cloud
//! compute-and-storage API. Rotation logic only ever talks to this trait;
//! the AWS binding lives in `autosnap-aws` and an in-memory fake is provided
//! in the `fakes` module.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::model::{Instance, Snapshot, SnapshotId, TagFilter, Tags, Volume, VolumeId};

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Cloud compute-and-storage API used by the rotation stages.
///
/// Every call is a single blocking round-trip from the caller's point of
/// view. Implementations must not retry.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// List instances whose tags satisfy `filter`.
    async fn list_instances(&self, filter: &TagFilter) -> ProviderResult<Vec<Instance>>;

    /// List every volume visible to the caller.
    async fn list_volumes(&self) -> ProviderResult<Vec<Volume>>;

    /// Request a snapshot of `volume_id`.
    ///
    /// Returns `None` when the provider accepted the request without
    /// creating anything (a dry run).
    async fn create_snapshot(
        &self,
        volume_id: &VolumeId,
        description: &str,
        dry_run: bool,
    ) -> ProviderResult<Option<Snapshot>>;

    /// Write `tags` onto a resource in one batched call, overwriting keys
    /// that already exist.
    async fn set_tags(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()>;

    /// List snapshots owned by the caller whose tags satisfy `filter`.
    async fn list_snapshots(&self, filter: &TagFilter) -> ProviderResult<Vec<Snapshot>>;

    /// Permanently delete a snapshot. A dry run deletes nothing.
    async fn delete_snapshot(&self, snapshot_id: &SnapshotId, dry_run: bool)
        -> ProviderResult<()>;
}
