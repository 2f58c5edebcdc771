//! Error types for autosnap-core

use autosnap_provider::{ProviderError, SnapshotId};
use thiserror::Error;

/// Errors that abort a rotation stage.
#[derive(Error, Debug)]
pub enum RotationError {
    /// Any provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A managed snapshot carries a `Date` tag that is not `YYYY-MM-DD`
    #[error("snapshot {snapshot_id} has malformed Date tag {value:?}")]
    InvalidDateTag {
        snapshot_id: SnapshotId,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Rotation settings are unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for rotation operations
pub type RotationResult<T> = std::result::Result<T, RotationError>;
