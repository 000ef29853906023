//! On-disk pipeline state: job checkpoints and cache snapshots.
//!
//! Both stores keep one JSON file per repository in a configured directory.
//! Loading never fails: missing or corrupt files read as absent so a damaged
//! state file costs a refetch, not a crashed job.

mod checkpoint;
mod error;
mod files;
mod snapshot;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use error::PersistenceError;
pub use snapshot::{CacheSnapshot, SnapshotStore};
