pub mod backend;
#[cfg(test)]
pub(crate) mod fault;
pub mod local;
pub mod memory;
pub mod s3;

pub use backend::{with_retry, BackendType, BucketAdmin, Remote};
pub use local::LocalTree;
pub use memory::MemoryBucketAdmin;
pub use s3::S3BucketAdmin;
