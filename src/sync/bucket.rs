//! Bucket Lifecycle: make sure the bucket exists before anything else runs.

use tracing::info;

use crate::error::Result;
use crate::fs::BucketAdmin;

/// What `ensure_bucket` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Existed,
    Created,
}

/// Create `bucket` if the store reports it missing.
///
/// Only a definite "not found" leads to creation. Any other failure of the
/// existence check is returned unchanged.
pub async fn ensure_bucket(admin: &dyn BucketAdmin, bucket: &str) -> Result<BucketState> {
    if admin.bucket_exists(bucket).await? {
        return Ok(BucketState::Existed);
    }

    info!(bucket, "bucket does not exist, creating it");
    admin.create_bucket(bucket).await?;
    Ok(BucketState::Created)
}
