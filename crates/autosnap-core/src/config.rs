//! Rotation settings.

use autosnap_provider::{TagFilter, FLAG_TRUE};
use serde::{Deserialize, Serialize};

use crate::error::{RotationError, RotationResult};

/// Instance tag that opts an instance into snapshotting.
pub const DEFAULT_ELIGIBILITY_TAG: &str = "ToSnap";

/// Snapshot tag marking snapshots created (and owned) by autosnap.
pub const DEFAULT_MARKER_TAG: &str = "AutoSnapshot";

/// Days a snapshot is kept before the reaper removes it.
pub const DEFAULT_RETENTION_DAYS: u32 = 14;

/// Settings shared by the creator and the reaper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Instance tag key that marks an instance for snapshotting
    pub eligibility_tag: String,
    /// Snapshot tag key that marks a snapshot as managed
    pub marker_tag: String,
    /// Snapshots dated strictly before `today - retention_days` are deleted
    pub retention_days: u32,
    /// When true, tag filters also require the value `True`
    pub match_value: bool,
    /// Pass `dry_run` to mutating provider calls
    pub dry_run: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            eligibility_tag: DEFAULT_ELIGIBILITY_TAG.to_string(),
            marker_tag: DEFAULT_MARKER_TAG.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            match_value: false,
            dry_run: false,
        }
    }
}

impl RotationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eligibility_tag(mut self, key: impl Into<String>) -> Self {
        self.eligibility_tag = key.into();
        self
    }

    pub fn with_marker_tag(mut self, key: impl Into<String>) -> Self {
        self.marker_tag = key.into();
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_match_value(mut self, match_value: bool) -> Self {
        self.match_value = match_value;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reject settings that would make a run meaningless or destructive.
    pub fn validate(&self) -> RotationResult<()> {
        if self.eligibility_tag.trim().is_empty() {
            return Err(RotationError::InvalidConfig(
                "eligibility tag key must not be empty".to_string(),
            ));
        }
        if self.marker_tag.trim().is_empty() {
            return Err(RotationError::InvalidConfig(
                "marker tag key must not be empty".to_string(),
            ));
        }
        if self.retention_days == 0 {
            return Err(RotationError::InvalidConfig(
                "retention must be at least one day".to_string(),
            ));
        }
        Ok(())
    }

    /// Filter selecting instances to snapshot.
    pub fn eligibility_filter(&self) -> TagFilter {
        self.filter_for(&self.eligibility_tag)
    }

    /// Filter selecting snapshots the reaper may consider.
    pub fn marker_filter(&self) -> TagFilter {
        self.filter_for(&self.marker_tag)
    }

    fn filter_for(&self, key: &str) -> TagFilter {
        if self.match_value {
            TagFilter::equals(key, FLAG_TRUE)
        } else {
            TagFilter::key_present(key)
        }
    }
}
