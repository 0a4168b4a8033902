use crate::client::{AwsS3Client, ClientError, ObjectClient, PutObject};
use crate::context::RequestContext;
use crate::keys::{object_key, url_key};
use crate::signer::{encode_path, presign_v4, Clock, Credentials, SystemClock, SIGNING_REGION};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::BackendKind;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use stowage_core::StorageConfig;
use url::Url;

/// S3-compatible storage implementation
///
/// Writes go through the API endpoint; URLs are presigned locally against the
/// CDN host, so [`Storage::get_url`] never touches the network.
#[derive(Clone)]
pub struct S3Storage {
    config: Arc<StorageConfig>,
    client: Arc<dyn ObjectClient>,
    clock: Arc<dyn Clock>,
}

impl S3Storage {
    /// Create a new S3Storage instance backed by `aws-sdk-s3`.
    ///
    /// Credentials and bucket existence are not checked here; the bucket is
    /// created lazily on first save.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let client = AwsS3Client::new(&config)?;
        Ok(Self::with_client(
            config,
            Arc::new(client),
            Arc::new(SystemClock),
        ))
    }

    /// Use an arbitrary client and signing clock.
    pub fn with_client(
        config: StorageConfig,
        client: Arc<dyn ObjectClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        S3Storage {
            config: Arc::new(config),
            client,
            clock,
        }
    }

    pub fn bucket(&self) -> &str {
        self.config.path()
    }

    /// Make sure the bucket exists. A concurrent creator winning the race is
    /// not an error.
    async fn create_bucket_if_not_exists(&self) -> StorageResult<()> {
        let bucket = self.bucket();

        if self.client.bucket_exists(bucket).await? {
            return Ok(());
        }

        match self.client.create_bucket(bucket).await {
            Ok(()) => {
                tracing::info!(bucket = %bucket, "S3 bucket created");
                Ok(())
            }
            Err(ClientError::BucketAlreadyExists { .. }) => {
                tracing::debug!(bucket = %bucket, "S3 bucket created concurrently");
                Ok(())
            }
            Err(source) => Err(StorageError::BucketCreationFailed {
                bucket: bucket.to_string(),
                source,
            }),
        }
    }

    fn cdn_base_url(&self) -> StorageResult<Url> {
        let scheme = if self.config.cdn_secure() {
            "https"
        } else {
            "http"
        };
        Url::parse(&format!("{}://{}/", scheme, self.config.cdn_endpoint())).map_err(|e| {
            StorageError::ConfigError(format!(
                "invalid CDN endpoint {:?}: {}",
                self.config.cdn_endpoint(),
                e
            ))
        })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn save(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
        content: Bytes,
        expiry: Duration,
    ) -> StorageResult<()> {
        let key = object_key(directory, filename);
        let size = content.len() as u64;
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let expires = if expiry.is_zero() {
            None
        } else {
            let expiry = chrono::Duration::from_std(expiry).map_err(|e| {
                StorageError::ConfigError(format!("object expiry out of range: {}", e))
            })?;
            Some(self.clock.now() + expiry)
        };

        let start = std::time::Instant::now();

        let result = ctx
            .run("save", async {
                self.create_bucket_if_not_exists().await?;
                self.client
                    .put_object(PutObject {
                        bucket: self.bucket().to_string(),
                        key: key.clone(),
                        body: content,
                        content_type,
                        expires,
                    })
                    .await?;
                Ok::<(), StorageError>(())
            })
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket(),
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 save failed"
            );
            e
        })?;

        tracing::info!(
            bucket = %self.bucket(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 save successful"
        );

        Ok(())
    }

    fn get_url(
        &self,
        directory: &str,
        filename: &str,
        url_expiry: Duration,
    ) -> StorageResult<Url> {
        let key = url_key(directory, filename);
        let mut url = self.cdn_base_url()?;
        url.set_path(&encode_path(&key));

        let credentials = Credentials {
            access_key: self.config.access_key(),
            secret_key: self.config.secret_key(),
            session_token: None,
        };

        let signed = presign_v4(
            &Method::GET,
            &url,
            &credentials,
            SIGNING_REGION,
            url_expiry.as_secs(),
            self.clock.now(),
        );

        tracing::debug!(key = %key, expires_secs = url_expiry.as_secs(), "Presigned CDN URL");

        Ok(signed)
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
    ) -> StorageResult<()> {
        let key = object_key(directory, filename);
        let start = std::time::Instant::now();

        let result = ctx
            .run("delete", async {
                self.client
                    .remove_object(self.bucket(), &key)
                    .await
                    .map_err(StorageError::from)
            })
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket(),
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            e
        })?;

        tracing::info!(
            bucket = %self.bucket(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::S3Like
    }
}
