//! Backend client adapter for S3-compatible stores.
//!
//! [`ObjectClient`] is the narrow set of remote calls the S3 backend needs.
//! [`AwsS3Client`] implements it over `aws-sdk-s3`; tests substitute an
//! in-memory client. Cancellation is applied by the caller, which drops the
//! returned future when its [`RequestContext`](crate::RequestContext) fires.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors reported by an [`ObjectClient`]
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Bucket {bucket} already exists")]
    BucketAlreadyExists { bucket: String },

    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
}

/// A single object upload.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    /// Object-level expiration timestamp, if any.
    pub expires: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError>;

    /// Create `bucket`. Must report an existing bucket as
    /// [`ClientError::BucketAlreadyExists`].
    async fn create_bucket(&self, bucket: &str) -> Result<(), ClientError>;

    async fn put_object(&self, object: PutObject) -> Result<(), ClientError>;

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), ClientError>;
}

#[cfg(feature = "storage-s3")]
pub use aws::AwsS3Client;

#[cfg(feature = "storage-s3")]
mod aws {
    use super::{ClientError, ObjectClient, PutObject};
    use crate::signer::SIGNING_REGION;
    use crate::traits::{StorageError, StorageResult};
    use async_trait::async_trait;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
    use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
    use aws_sdk_s3::Client;
    use stowage_core::StorageConfig;

    /// `aws-sdk-s3` backed client using static credentials and path-style
    /// addressing (required for MinIO and most S3-compatible providers).
    #[derive(Clone, Debug)]
    pub struct AwsS3Client {
        client: Client,
    }

    impl AwsS3Client {
        /// Build a client for `config`. No request is sent.
        pub fn new(config: &StorageConfig) -> StorageResult<Self> {
            if config.endpoint().trim().is_empty() {
                return Err(StorageError::ConfigError(
                    "s3-like object storage requires an endpoint".to_string(),
                ));
            }

            let endpoint_url = if config.endpoint().contains("://") {
                config.endpoint().to_string()
            } else {
                let scheme = if config.secure() { "https" } else { "http" };
                format!("{}://{}", scheme, config.endpoint())
            };

            let credentials = Credentials::new(
                config.access_key(),
                config.secret_key(),
                None,
                None,
                "stowage-static",
            );

            let s3_config = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new(SIGNING_REGION))
                .endpoint_url(endpoint_url)
                .credentials_provider(credentials)
                .force_path_style(true)
                .build();

            Ok(AwsS3Client {
                client: Client::from_conf(s3_config),
            })
        }
    }

    #[async_trait]
    impl ObjectClient for AwsS3Client {
        async fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError> {
            match self.client.head_bucket().bucket(bucket).send().await {
                Ok(_) => Ok(true),
                Err(err) => {
                    if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                        return Ok(false);
                    }
                    Err(ClientError::Service {
                        operation: "bucket_exists",
                        message: DisplayErrorContext(&err).to_string(),
                    })
                }
            }
        }

        async fn create_bucket(&self, bucket: &str) -> Result<(), ClientError> {
            match self.client.create_bucket().bucket(bucket).send().await {
                Ok(_) => Ok(()),
                Err(err) => {
                    let already_exists = err.as_service_error().is_some_and(|e| {
                        e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                    });
                    if already_exists {
                        return Err(ClientError::BucketAlreadyExists {
                            bucket: bucket.to_string(),
                        });
                    }
                    Err(ClientError::Service {
                        operation: "create_bucket",
                        message: DisplayErrorContext(&err).to_string(),
                    })
                }
            }
        }

        async fn put_object(&self, object: PutObject) -> Result<(), ClientError> {
            let content_length = object.body.len() as i64;
            let mut request = self
                .client
                .put_object()
                .bucket(&object.bucket)
                .key(&object.key)
                .content_length(content_length)
                .content_type(&object.content_type)
                .body(ByteStream::from(object.body));

            if let Some(expires) = object.expires {
                request = request.expires(AwsDateTime::from_secs(expires.timestamp()));
            }

            request
                .send()
                .await
                .map(|_| ())
                .map_err(|err| ClientError::Service {
                    operation: "put_object",
                    message: DisplayErrorContext(&err).to_string(),
                })
        }

        async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), ClientError> {
            match self
                .client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
            {
                Ok(_) => Ok(()),
                Err(err) => {
                    if err
                        .as_service_error()
                        .and_then(|e| e.code())
                        .is_some_and(|code| code == "NoSuchKey")
                    {
                        return Err(ClientError::NotFound {
                            key: key.to_string(),
                        });
                    }
                    Err(ClientError::Service {
                        operation: "remove_object",
                        message: DisplayErrorContext(&err).to_string(),
                    })
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn construction_needs_no_network() {
            let config = StorageConfig::s3_like("127.0.0.1:1", "bucket", "AKID", "secret");
            assert!(AwsS3Client::new(&config).is_ok());
        }

        #[test]
        fn missing_endpoint_is_config_error() {
            let config = StorageConfig::s3_like("", "bucket", "AKID", "secret");
            assert!(matches!(
                AwsS3Client::new(&config),
                Err(StorageError::ConfigError(_))
            ));
        }
    }
}
