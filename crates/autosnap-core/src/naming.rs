//! Names, descriptions and date tags written onto snapshots.
//!
//! The formats here are persisted in tags and read back by later runs, so
//! they are not configurable.

use autosnap_provider::{SnapshotId, Tags, DATE_TAG, NAME_TAG};
use chrono::{Days, NaiveDate};

use crate::error::{RotationError, RotationResult};

/// Format of the `Date` tag and of the date embedded in names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a snapshot's `Date` tag value.
pub fn parse_date_tag(snapshot_id: &SnapshotId, value: &str) -> RotationResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| {
        RotationError::InvalidDateTag {
            snapshot_id: snapshot_id.clone(),
            value: value.to_string(),
            source,
        }
    })
}

/// `Auto <instance> <date> Snapshot`
pub fn snapshot_description(instance_name: &str, date: NaiveDate) -> String {
    format!("Auto {} {} Snapshot", instance_name, format_date(date))
}

/// `auto-<instance>-<date>-snapshot`
pub fn snapshot_name(instance_name: &str, date: NaiveDate) -> String {
    format!("auto-{}-{}-snapshot", instance_name, format_date(date))
}

/// Tags applied to a freshly created snapshot in one batched write.
pub fn snapshot_tags(marker_tag: &str, instance_name: &str, date: NaiveDate) -> Tags {
    Tags::new()
        .with(NAME_TAG, snapshot_name(instance_name, date))
        .with_flag(marker_tag, true)
        .with(DATE_TAG, format_date(date))
}

/// Cutoff date: snapshots dated strictly before it are expired.
///
/// Saturates at the minimum representable date rather than failing.
pub fn retention_threshold(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}
