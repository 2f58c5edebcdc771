//! Snapshot retention stage.
//!
//! Deletes managed snapshots whose `Date` tag is strictly older than the
//! retention threshold. The tag is the only age signal; provider-side start
//! times are ignored.

use autosnap_provider::{CloudProvider, SnapshotId};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::RotationConfig;
use crate::error::RotationResult;
use crate::naming::{format_date, parse_date_tag, retention_threshold};

/// A managed snapshot the reaper evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedSnapshot {
    pub id: SnapshotId,
    pub name: String,
    pub date: NaiveDate,
}

/// Result of a reap pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    pub threshold: NaiveDate,
    /// Deletions were requested with `dry_run`; nothing was removed.
    pub dry_run: bool,
    pub deleted: Vec<ReviewedSnapshot>,
    pub kept: Vec<ReviewedSnapshot>,
    /// Managed snapshots without a `Name` or `Date` tag.
    pub skipped: Vec<SnapshotId>,
}

impl ReapReport {
    fn new(threshold: NaiveDate, dry_run: bool) -> Self {
        Self {
            threshold,
            dry_run,
            deleted: Vec::new(),
            kept: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl std::fmt::Display for ReapReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.dry_run { "would delete" } else { "deleted" };
        write!(
            f,
            "{} {} snapshot(s) dated before {}, kept {}, skipped {} without Name/Date",
            verb,
            self.deleted.len(),
            format_date(self.threshold),
            self.kept.len(),
            self.skipped.len()
        )
    }
}

/// Whether a snapshot dated `date` has outlived `threshold`.
pub fn is_expired(date: NaiveDate, threshold: NaiveDate) -> bool {
    date < threshold
}

/// Delete every managed snapshot dated strictly before
/// `today - retention_days`.
///
/// A malformed `Date` tag or any provider failure aborts the pass; deletions
/// already issued are not undone.
#[instrument(skip(provider, config), fields(date = %today))]
pub async fn delete_old_snapshots(
    provider: &dyn CloudProvider,
    config: &RotationConfig,
    today: NaiveDate,
) -> RotationResult<ReapReport> {
    config.validate()?;

    let threshold = retention_threshold(today, config.retention_days);
    info!(
        threshold = %format_date(threshold),
        "Deleting snapshots dated before {}",
        format_date(threshold)
    );

    let filter = config.marker_filter();
    let snapshots = provider.list_snapshots(&filter).await?;
    info!(count = snapshots.len(), %filter, "Found managed snapshots");

    let mut report = ReapReport::new(threshold, config.dry_run);

    for snapshot in &snapshots {
        let (Some(name), Some(date_tag)) = (snapshot.name(), snapshot.date_tag()) else {
            warn!(
                snapshot_id = %snapshot.id,
                "Snapshot {} has either no Name or no Date tag",
                snapshot.id
            );
            report.skipped.push(snapshot.id.clone());
            continue;
        };

        let date = parse_date_tag(&snapshot.id, date_tag)?;
        let reviewed = ReviewedSnapshot {
            id: snapshot.id.clone(),
            name: name.to_string(),
            date,
        };

        if is_expired(date, threshold) {
            if config.dry_run {
                info!(
                    snapshot_id = %snapshot.id,
                    date = %date_tag,
                    "Dry run: snapshot {} older than {} days, not removed",
                    name,
                    config.retention_days
                );
            } else {
                info!(
                    snapshot_id = %snapshot.id,
                    date = %date_tag,
                    "Snapshot {} older than {} days, removing",
                    name,
                    config.retention_days
                );
            }
            provider
                .delete_snapshot(&snapshot.id, config.dry_run)
                .await?;
            report.deleted.push(reviewed);
        } else {
            info!(
                snapshot_id = %snapshot.id,
                date = %date_tag,
                "Snapshot {} is within {} days, keeping",
                name,
                config.retention_days
            );
            report.kept.push(reviewed);
        }
    }

    Ok(report)
}
