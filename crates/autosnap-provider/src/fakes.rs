//! In-memory fake provider (testing only)
//!
//! `MemoryCloud` keeps instances, volumes and snapshots in memory, records
//! every call made against it, and can be told to fail a specific call so
//! that partial-failure paths can be exercised without a real account.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ProviderError;
use crate::model::*;
use crate::provider::{CloudProvider, ProviderResult};

/// Provider operation, used to address calls in the log and for failure
/// injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    ListInstances,
    ListVolumes,
    CreateSnapshot,
    SetTags,
    ListSnapshots,
    DeleteSnapshot,
}

/// A recorded call against [`MemoryCloud`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ListInstances(TagFilter),
    ListVolumes,
    CreateSnapshot {
        volume_id: VolumeId,
        description: String,
        dry_run: bool,
    },
    SetTags {
        resource_id: String,
        tags: Tags,
    },
    ListSnapshots(TagFilter),
    DeleteSnapshot {
        snapshot_id: SnapshotId,
        dry_run: bool,
    },
}

impl ProviderCall {
    pub fn op(&self) -> ProviderOp {
        match self {
            ProviderCall::ListInstances(_) => ProviderOp::ListInstances,
            ProviderCall::ListVolumes => ProviderOp::ListVolumes,
            ProviderCall::CreateSnapshot { .. } => ProviderOp::CreateSnapshot,
            ProviderCall::SetTags { .. } => ProviderOp::SetTags,
            ProviderCall::ListSnapshots(_) => ProviderOp::ListSnapshots,
            ProviderCall::DeleteSnapshot { .. } => ProviderOp::DeleteSnapshot,
        }
    }
}

#[derive(Debug, Default)]
struct CloudState {
    instances: Vec<Instance>,
    volumes: Vec<Volume>,
    snapshots: Vec<Snapshot>,
    calls: Vec<ProviderCall>,
    // op -> 1-based call number that must fail
    failures: HashMap<ProviderOp, usize>,
}

impl CloudState {
    /// Record a call and report whether it was scheduled to fail.
    fn record(&mut self, call: ProviderCall) -> ProviderResult<()> {
        let op = call.op();
        self.calls.push(call);
        let nth = self.calls.iter().filter(|c| c.op() == op).count();
        if self.failures.get(&op) == Some(&nth) {
            return Err(ProviderError::Api {
                operation: format!("{op:?}"),
                code: "InjectedFailure".to_string(),
                message: format!("call #{nth} to {op:?} was scheduled to fail"),
            });
        }
        Ok(())
    }
}

/// In-memory cloud account.
#[derive(Debug, Default)]
pub struct MemoryCloud {
    state: Mutex<CloudState>,
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance with the given tags.
    pub fn add_instance(&self, id: &str, tags: Tags) {
        let mut state = self.state.lock().unwrap();
        state.instances.push(Instance::new(id, tags));
    }

    /// Add a volume, optionally attached to an instance.
    pub fn add_volume(&self, id: &str, attached_to: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state
            .volumes
            .push(Volume::new(id, attached_to.map(InstanceId::new)));
    }

    /// Seed an existing snapshot.
    pub fn add_snapshot(&self, id: &str, volume_id: &str, tags: Tags) {
        let mut state = self.state.lock().unwrap();
        state.snapshots.push(Snapshot {
            id: SnapshotId::new(id),
            volume_id: VolumeId::new(volume_id),
            description: String::new(),
            tags,
            started_at: None,
        });
    }

    /// Make the `nth` (1-based) call to `op` fail with an API error.
    pub fn fail_on(&self, op: ProviderOp, nth: usize) {
        let mut state = self.state.lock().unwrap();
        state.failures.insert(op, nth);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls made so far to a single operation.
    pub fn calls_to(&self, op: ProviderOp) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(|c| c.op() == op).collect()
    }

    /// Current snapshots, in creation order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.state.lock().unwrap().snapshots.clone()
    }

    pub fn snapshot(&self, id: &SnapshotId) -> Option<Snapshot> {
        self.snapshots().into_iter().find(|s| &s.id == id)
    }
}

fn new_snapshot_id() -> SnapshotId {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    SnapshotId(format!("snap-{}", &raw[..17]))
}

#[async_trait]
impl CloudProvider for MemoryCloud {
    async fn list_instances(&self, filter: &TagFilter) -> ProviderResult<Vec<Instance>> {
        let mut state = self.state.lock().unwrap();
        state.record(ProviderCall::ListInstances(filter.clone()))?;
        Ok(state
            .instances
            .iter()
            .filter(|i| filter.matches(&i.tags))
            .cloned()
            .collect())
    }

    async fn list_volumes(&self) -> ProviderResult<Vec<Volume>> {
        let mut state = self.state.lock().unwrap();
        state.record(ProviderCall::ListVolumes)?;
        Ok(state.volumes.clone())
    }

    async fn create_snapshot(
        &self,
        volume_id: &VolumeId,
        description: &str,
        dry_run: bool,
    ) -> ProviderResult<Option<Snapshot>> {
        let mut state = self.state.lock().unwrap();
        state.record(ProviderCall::CreateSnapshot {
            volume_id: volume_id.clone(),
            description: description.to_string(),
            dry_run,
        })?;
        if !state.volumes.iter().any(|v| &v.id == volume_id) {
            return Err(ProviderError::NotFound {
                kind: "volume",
                id: volume_id.to_string(),
            });
        }
        if dry_run {
            return Ok(None);
        }
        let snapshot = Snapshot {
            id: new_snapshot_id(),
            volume_id: volume_id.clone(),
            description: description.to_string(),
            tags: Tags::new(),
            started_at: Some(Utc::now()),
        };
        state.snapshots.push(snapshot.clone());
        Ok(Some(snapshot))
    }

    async fn set_tags(&self, resource_id: &str, tags: &Tags) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(ProviderCall::SetTags {
            resource_id: resource_id.to_string(),
            tags: tags.clone(),
        })?;
        if let Some(snapshot) = state
            .snapshots
            .iter_mut()
            .find(|s| s.id.as_str() == resource_id)
        {
            snapshot.tags.extend(tags);
            return Ok(());
        }
        if let Some(instance) = state
            .instances
            .iter_mut()
            .find(|i| i.id.as_str() == resource_id)
        {
            instance.tags.extend(tags);
            return Ok(());
        }
        Err(ProviderError::NotFound {
            kind: "resource",
            id: resource_id.to_string(),
        })
    }

    async fn list_snapshots(&self, filter: &TagFilter) -> ProviderResult<Vec<Snapshot>> {
        let mut state = self.state.lock().unwrap();
        state.record(ProviderCall::ListSnapshots(filter.clone()))?;
        Ok(state
            .snapshots
            .iter()
            .filter(|s| filter.matches(&s.tags))
            .cloned()
            .collect())
    }

    async fn delete_snapshot(
        &self,
        snapshot_id: &SnapshotId,
        dry_run: bool,
    ) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(ProviderCall::DeleteSnapshot {
            snapshot_id: snapshot_id.clone(),
            dry_run,
        })?;
        let pos = state
            .snapshots
            .iter()
            .position(|s| &s.id == snapshot_id)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "snapshot",
                id: snapshot_id.to_string(),
            })?;
        if !dry_run {
            state.snapshots.remove(pos);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failure_hits_only_nth_call() {
        let cloud = MemoryCloud::new();
        cloud.add_volume("vol-1", None);
        cloud.fail_on(ProviderOp::CreateSnapshot, 2);

        assert!(cloud
            .create_snapshot(&VolumeId::new("vol-1"), "a", false)
            .await
            .is_ok());
        let err = cloud
            .create_snapshot(&VolumeId::new("vol-1"), "b", false)
            .await
            .unwrap_err();
        assert_eq!(err.api_code(), Some("InjectedFailure"));
        assert!(cloud
            .create_snapshot(&VolumeId::new("vol-1"), "c", false)
            .await
            .is_ok());

        assert_eq!(cloud.snapshots().len(), 2);
        assert_eq!(cloud.calls_to(ProviderOp::CreateSnapshot).len(), 3);
    }

    #[tokio::test]
    async fn generated_ids_look_like_snapshot_ids() {
        let cloud = MemoryCloud::new();
        cloud.add_volume("vol-1", None);
        let snap = cloud
            .create_snapshot(&VolumeId::new("vol-1"), "d", false)
            .await
            .unwrap()
            .unwrap();
        assert!(snap.id.as_str().starts_with("snap-"));
        assert_eq!(snap.id.as_str().len(), "snap-".len() + 17);
    }
}
