use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opendal::layers::{RetryLayer, TimeoutLayer};
use opendal::Operator;

use crate::config::RetryConfig;
use crate::error::Result;

/// Backend type information for display and identification
#[derive(Debug, Clone, PartialEq)]
pub enum BackendType {
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
    },
    Memory { bucket: String },
}

impl BackendType {
    /// Get a short display name for the backend
    pub fn short_name(&self) -> &'static str {
        match self {
            BackendType::S3 { .. } => "S3",
            BackendType::Memory { .. } => "Memory",
        }
    }
}

/// Wrap `operator` in the per-attempt timeout and the retry policy.
///
/// Retry sits outside timeout, so a timed-out attempt is retried. Only
/// errors opendal marks temporary are retried.
pub fn with_retry(operator: Operator, timeout: Duration, retry: &RetryConfig) -> Operator {
    let retries = usize::try_from(retry.max_attempts.saturating_sub(1)).unwrap_or(usize::MAX);

    operator
        .layer(TimeoutLayer::new().with_timeout(timeout))
        .layer(
            RetryLayer::new()
                .with_max_times(retries)
                .with_min_delay(retry.min_delay())
                .with_max_delay(retry.max_delay())
                .with_jitter(),
        )
}

/// Bucket-level administration the object operator cannot do itself.
#[async_trait]
pub trait BucketAdmin: Send + Sync {
    /// `Ok(false)` only when the store says the bucket does not exist; every
    /// other failure is returned as an error.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;
}

/// Handle on the one bucket addressed by a synchronizer instance.
///
/// Object reads, writes, deletes and listings go through `operator`, which is
/// rooted at the bucket and already carries the retry and timeout layers.
#[derive(Clone)]
pub struct Remote {
    operator: Operator,
    bucket: String,
    admin: Arc<dyn BucketAdmin>,
    backend_type: BackendType,
}

impl Remote {
    pub fn new(
        operator: Operator,
        bucket: impl Into<String>,
        admin: Arc<dyn BucketAdmin>,
        backend_type: BackendType,
    ) -> Self {
        Self {
            operator,
            bucket: bucket.into(),
            admin,
            backend_type,
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn admin(&self) -> &dyn BucketAdmin {
        self.admin.as_ref()
    }

    pub fn backend_type(&self) -> &BackendType {
        &self.backend_type
    }
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote")
            .field("bucket", &self.bucket)
            .field("backend_type", &self.backend_type)
            .finish()
    }
}
