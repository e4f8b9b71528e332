use std::sync::Arc;

use async_trait::async_trait;
use aws_config::retry::RetryConfig as AwsRetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use opendal::{services::S3, Operator};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::fs::backend::{with_retry, BackendType, BucketAdmin, Remote};

/// Connect to the configured S3 (or S3-compatible) bucket.
///
/// Explicit credentials from the config are used when present; otherwise both
/// clients fall back to the standard AWS credential chain (environment,
/// shared credentials file, instance profile).
pub async fn connect(config: &Config) -> Result<Remote> {
    let operator = build_operator(config)?;
    let admin = S3BucketAdmin::new(config).await;

    Ok(Remote::new(
        operator,
        config.bucket.clone(),
        Arc::new(admin),
        BackendType::S3 {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        },
    ))
}

/// Object operator rooted at the bucket, with timeout and retry layers.
pub fn build_operator(config: &Config) -> Result<Operator> {
    let mut builder = S3::default().bucket(&config.bucket).region(&config.region);

    if let Some(creds) = &config.credentials {
        builder = builder
            .access_key_id(&creds.access_key_id)
            .secret_access_key(&creds.secret_access_key);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint(endpoint);
    }

    let operator = Operator::new(builder)
        .map_err(|e| SyncError::from_opendal(e, "configure S3 operator"))?
        .finish();

    Ok(with_retry(operator, config.timeout(), &config.retry))
}

/// Bucket existence check and creation through the AWS SDK.
pub struct S3BucketAdmin {
    client: Client,
    region: String,
}

impl S3BucketAdmin {
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(AwsRetryConfig::standard().with_max_attempts(config.retry.max_attempts))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(config.timeout())
                    .build(),
            );

        if let Some(creds) = &config.credentials {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "storemaster",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            region: config.region.clone(),
        }
    }
}

#[async_trait]
impl BucketAdmin for S3BucketAdmin {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ctx)) if ctx.err().is_not_found() => Ok(false),
            Err(err) => match SyncError::from_sdk(err, "check bucket") {
                SyncError::NotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(ctx)) if ctx.err().is_bucket_already_owned_by_you() => {
                debug!(bucket, "bucket created concurrently by this account");
                Ok(())
            }
            Err(err) => Err(SyncError::from_sdk(err, "create bucket")),
        }
    }
}
