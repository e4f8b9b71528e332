//! Synchronization between the local root and the bucket.
//!
//! Leaves first: key filtering, remote listing, set diff, single-key
//! transfers and bucket creation, composed by [`engine::SyncEngine`].

pub mod bucket;
pub mod diff;
pub mod engine;
pub mod exclude;
pub mod index;
pub mod transfer;

pub use bucket::{ensure_bucket, BucketState};
pub use diff::{diff, Diff};
pub use engine::{SyncEngine, SyncMode, SyncOptions, SyncPhase, SyncProgress, SyncReport};
pub use exclude::KeyFilter;
pub use index::RemoteIndex;
pub use transfer::{Transfer, TransferOutcome};
