//! autosnap-provider: cloud API abstraction for autosnap
//!
//! This crate defines the resource model (instances, volumes, snapshots,
//! tags) and the `CloudProvider` trait that the rotation stages are written
//! against.
//!
//! ## Key Components
//!
//! - `CloudProvider`: list/create/tag/delete call surface
//! - `TagFilter`: typed tag query (key presence or exact value)
//! - `fakes::MemoryCloud`: in-memory provider with a call log and
//!   failure injection

mod error;
pub mod fakes;
pub mod model;
pub mod provider;

pub use error::ProviderError;
pub use model::{
    Instance, InstanceId, Snapshot, SnapshotId, TagFilter, TagMatch, Tags, Volume, VolumeId,
    DATE_TAG, FLAG_TRUE, NAME_TAG,
};
pub use provider::{CloudProvider, ProviderResult};
