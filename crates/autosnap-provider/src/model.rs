//! Resource model shared by every provider backend.
//!
//! Instances, volumes and snapshots are identified by provider-assigned IDs
//! and described by string tags. Tags are the only metadata autosnap
//! persists, so [`Tags`] and [`TagFilter`] carry most of the semantics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag key holding a resource's display name.
pub const NAME_TAG: &str = "Name";

/// Tag key holding a snapshot's creation date (`YYYY-MM-DD`).
pub const DATE_TAG: &str = "Date";

/// String encoding of a `true` flag tag value. Tag values are strings on the
/// wire.
pub const FLAG_TRUE: &str = "True";

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

resource_id!(
    /// Provider ID of a compute instance (e.g. `i-0abc...`).
    InstanceId
);
resource_id!(
    /// Provider ID of a block-storage volume (e.g. `vol-0abc...`).
    VolumeId
);
resource_id!(
    /// Provider ID of a snapshot (e.g. `snap-0abc...`).
    SnapshotId
);

/// Key/value tags attached to a resource.
///
/// Ordered so that batched tag writes and log output are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of a flag tag (`True` / `False`).
    pub fn with_flag(self, key: impl Into<String>, value: bool) -> Self {
        self.with(key, if value { FLAG_TRUE } else { "False" })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge `other` into `self`, overwriting existing keys.
    pub fn extend(&mut self, other: &Tags) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// The `Name` tag, if present.
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_TAG)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// How a [`TagFilter`] matches a resource's tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    /// The key is present, whatever its value.
    KeyPresent,
    /// The key is present and its value equals this string exactly.
    Equals(String),
}

/// Typed tag query passed to provider list calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub key: String,
    pub mode: TagMatch,
}

impl TagFilter {
    /// Match resources carrying `key`, regardless of value.
    pub fn key_present(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mode: TagMatch::KeyPresent,
        }
    }

    /// Match resources whose `key` tag equals `value`.
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mode: TagMatch::Equals(value.into()),
        }
    }

    /// Evaluate the filter against a tag set.
    pub fn matches(&self, tags: &Tags) -> bool {
        match (&self.mode, tags.get(&self.key)) {
            (_, None) => false,
            (TagMatch::KeyPresent, Some(_)) => true,
            (TagMatch::Equals(expected), Some(actual)) => expected == actual,
        }
    }
}

impl std::fmt::Display for TagFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.mode {
            TagMatch::KeyPresent => write!(f, "tag-key={}", self.key),
            TagMatch::Equals(value) => write!(f, "tag:{}={}", self.key, value),
        }
    }
}

/// A compute instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub tags: Tags,
}

impl Instance {
    pub fn new(id: impl Into<InstanceId>, tags: Tags) -> Self {
        Self {
            id: id.into(),
            tags,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.tags.name()
    }
}

/// A block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: VolumeId,
    /// Instance the volume is attached to, if any.
    pub attached_to: Option<InstanceId>,
}

impl Volume {
    pub fn new(id: impl Into<VolumeId>, attached_to: Option<InstanceId>) -> Self {
        Self {
            id: id.into(),
            attached_to,
        }
    }

    pub fn is_attached_to(&self, instance: &InstanceId) -> bool {
        self.attached_to.as_ref() == Some(instance)
    }
}

/// A point-in-time backup of a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub volume_id: VolumeId,
    pub description: String,
    pub tags: Tags,
    /// Provider-side start time. Informational only; age is always taken
    /// from the `Date` tag.
    pub started_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn name(&self) -> Option<&str> {
        self.tags.name()
    }

    pub fn date_tag(&self) -> Option<&str> {
        self.tags.get(DATE_TAG)
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<String> for VolumeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<String> for SnapshotId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
