//! autosnap-core: snapshot rotation logic
//!
//! Two stages run against any `CloudProvider`:
//!
//! - `creator`: snapshot every volume attached to an eligible instance and
//!   tag the snapshot with `Name`, the marker tag and `Date`
//! - `reaper`: delete managed snapshots whose `Date` tag is older than the
//!   retention window
//!
//! `rotation::run_rotation` runs both, creator first.

pub mod config;
pub mod creator;
mod error;
pub mod naming;
pub mod reaper;
pub mod rotation;
pub mod telemetry;

pub use config::{
    RotationConfig, DEFAULT_ELIGIBILITY_TAG, DEFAULT_MARKER_TAG, DEFAULT_RETENTION_DAYS,
};
pub use creator::{create_snapshots_for_day, CreatedSnapshot, CreationReport};
pub use error::{RotationError, RotationResult};
pub use naming::DATE_FORMAT;
pub use reaper::{delete_old_snapshots, ReapReport, ReviewedSnapshot};
pub use rotation::{run_rotation, RotationReport};
pub use telemetry::init_tracing;
