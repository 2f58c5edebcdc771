//! Snapshot creation stage.
//!
//! For every instance matched by the eligibility filter, snapshot every
//! volume attached to it and tag the result with its name, the marker tag
//! and the creation date.

use autosnap_provider::{CloudProvider, InstanceId, SnapshotId, Volume, VolumeId};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::RotationConfig;
use crate::error::RotationResult;
use crate::naming::{format_date, snapshot_description, snapshot_tags};

/// One snapshot request issued by the creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSnapshot {
    pub instance_id: InstanceId,
    pub instance_name: String,
    pub volume_id: VolumeId,
    /// `None` when the provider accepted a dry run without creating anything.
    pub snapshot_id: Option<SnapshotId>,
}

/// Result of a creation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreationReport {
    pub date: NaiveDate,
    pub created: Vec<CreatedSnapshot>,
    /// Eligible instances skipped because they have no `Name` tag.
    pub unnamed_instances: Vec<InstanceId>,
}

impl CreationReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            created: Vec::new(),
            unnamed_instances: Vec::new(),
        }
    }

    /// Snapshots that actually exist now.
    pub fn created_count(&self) -> usize {
        self.created
            .iter()
            .filter(|c| c.snapshot_id.is_some())
            .count()
    }
}

impl std::fmt::Display for CreationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created {} snapshot(s) for {} ({} request(s), {} unnamed instance(s) skipped)",
            self.created_count(),
            format_date(self.date),
            self.created.len(),
            self.unnamed_instances.len()
        )
    }
}

/// Volumes attached to `instance`, found by scanning the full volume list.
// TODO: index volumes by attached instance once per run if fleets outgrow
// a linear scan per instance.
pub fn attached_volumes<'a>(
    volumes: &'a [Volume],
    instance: &'a InstanceId,
) -> impl Iterator<Item = &'a Volume> + 'a {
    volumes.iter().filter(move |v| v.is_attached_to(instance))
}

/// Create and tag today's snapshots for every eligible, named instance.
///
/// Provider failures propagate immediately; snapshots created before the
/// failure are left in place.
#[instrument(skip(provider, config), fields(date = %today))]
pub async fn create_snapshots_for_day(
    provider: &dyn CloudProvider,
    config: &RotationConfig,
    today: NaiveDate,
) -> RotationResult<CreationReport> {
    config.validate()?;

    let date = format_date(today);
    let filter = config.eligibility_filter();
    let instances = provider.list_instances(&filter).await?;
    info!(count = instances.len(), %filter, "Found eligible instances");

    let mut report = CreationReport::new(today);
    let mut volumes: Option<Vec<Volume>> = None;

    for instance in &instances {
        let Some(name) = instance.name() else {
            warn!(instance_id = %instance.id, "Instance {} has no Name tag", instance.id);
            report.unnamed_instances.push(instance.id.clone());
            continue;
        };

        if volumes.is_none() {
            volumes = Some(provider.list_volumes().await?);
        }
        let all_volumes = volumes.as_deref().unwrap_or_default();

        let mut matched = 0usize;
        for volume in attached_volumes(all_volumes, &instance.id) {
            matched += 1;
            info!(
                instance_id = %instance.id,
                volume_id = %volume.id,
                "Creating automatic snapshot for {} on {}",
                name,
                date
            );

            let description = snapshot_description(name, today);
            let handle = provider
                .create_snapshot(&volume.id, &description, config.dry_run)
                .await?;

            let snapshot_id = match handle {
                Some(snapshot) => {
                    info!(
                        instance_id = %instance.id,
                        snapshot_id = %snapshot.id,
                        "Successful automatic snapshot for {} on {}",
                        name,
                        date
                    );
                    let tags = snapshot_tags(&config.marker_tag, name, today);
                    provider.set_tags(snapshot.id.as_str(), &tags).await?;
                    Some(snapshot.id)
                }
                None => {
                    info!(
                        instance_id = %instance.id,
                        volume_id = %volume.id,
                        "Dry run: snapshot for {} on {} not created",
                        name,
                        date
                    );
                    None
                }
            };

            report.created.push(CreatedSnapshot {
                instance_id: instance.id.clone(),
                instance_name: name.to_string(),
                volume_id: volume.id.clone(),
                snapshot_id,
            });
        }

        if matched == 0 {
            debug!(instance_id = %instance.id, "Instance {} has no attached volumes", name);
        }
    }

    Ok(report)
}
