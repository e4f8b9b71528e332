//! In-process bucket backed by opendal's memory service.
//!
//! Behaves like the S3 backend for every object operation, which makes it the
//! store of choice for tests and `--dry-run` experiments without credentials.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use opendal::{services::Memory, Operator};
use tokio::sync::Mutex;

use crate::error::{ErrorKind, Result, SyncError};
use crate::fs::backend::{BackendType, BucketAdmin, Remote};

/// Bucket registry kept in memory.
#[derive(Default)]
pub struct MemoryBucketAdmin {
    buckets: Mutex<HashSet<String>>,
    fail_with: Option<ErrorKind>,
}

impl MemoryBucketAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that already holds `bucket`.
    pub fn with_bucket(bucket: &str) -> Self {
        let mut buckets = HashSet::new();
        buckets.insert(bucket.to_string());
        Self {
            buckets: Mutex::new(buckets),
            fail_with: None,
        }
    }

    /// Registry whose existence check always fails with `kind`.
    pub fn failing(kind: ErrorKind) -> Self {
        Self {
            buckets: Mutex::new(HashSet::new()),
            fail_with: Some(kind),
        }
    }

    pub async fn contains(&self, bucket: &str) -> bool {
        self.buckets.lock().await.contains(bucket)
    }
}

#[async_trait]
impl BucketAdmin for MemoryBucketAdmin {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        if let Some(kind) = self.fail_with {
            let operation = "check bucket".to_string();
            let message = format!("injected {kind}");
            return match kind {
                ErrorKind::NotFound => Ok(false),
                ErrorKind::Auth => Err(SyncError::Auth { operation, message }),
                ErrorKind::Remote => Err(SyncError::Remote { operation, message }),
                _ => Err(SyncError::TransientNetwork { operation, message }),
            };
        }
        Ok(self.contains(bucket).await)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.buckets.lock().await.insert(bucket.to_string());
        Ok(())
    }
}

/// Remote over a fresh, empty memory store.
pub fn memory_remote(bucket: &str, admin: Arc<MemoryBucketAdmin>) -> Result<Remote> {
    let operator = Operator::new(Memory::default())
        .map_err(|e| SyncError::from_opendal(e, "configure memory operator"))?
        .finish();

    Ok(Remote::new(
        operator,
        bucket,
        admin,
        BackendType::Memory {
            bucket: bucket.to_string(),
        },
    ))
}
