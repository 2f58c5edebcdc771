//! Full rotation: create today's snapshots, then retire expired ones.

use autosnap_provider::CloudProvider;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::RotationConfig;
use crate::creator::{create_snapshots_for_day, CreationReport};
use crate::error::RotationResult;
use crate::reaper::{delete_old_snapshots, ReapReport};

/// Outcome of a complete rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    pub creation: CreationReport,
    pub reap: ReapReport,
}

/// Run the creator and, only if it succeeds, the reaper.
///
/// A run that fails during creation deletes nothing.
pub async fn run_rotation(
    provider: &dyn CloudProvider,
    config: &RotationConfig,
    today: NaiveDate,
) -> RotationResult<RotationReport> {
    let creation = create_snapshots_for_day(provider, config, today).await?;
    info!("{}", creation);

    let reap = delete_old_snapshots(provider, config, today).await?;
    info!("{}", reap);

    Ok(RotationReport { creation, reap })
}
