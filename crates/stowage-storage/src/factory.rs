#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{BackendKind, RequestContext, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use stowage_core::StorageConfig;
use url::Url;

/// Object storage facade
///
/// Built once from a [`StorageConfig`]; the backend is chosen at construction
/// and owns only the state it needs. Cheap to clone and safe to share across
/// tasks: no operation mutates in-process state.
#[derive(Clone)]
pub struct ObjectStorage {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    #[cfg(feature = "storage-s3")]
    S3(S3Storage),
    #[cfg(feature = "storage-local")]
    Local(LocalStorage),
    Disabled,
}

impl ObjectStorage {
    /// Create the backend selected by `config`.
    ///
    /// `s3-like` builds a client without contacting the server; `local`
    /// creates the root directory. Failures are returned as-is and no
    /// partially built instance escapes.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let kind = config.kind();
        let backend = match kind {
            #[cfg(feature = "storage-s3")]
            BackendKind::S3Like => Backend::S3(S3Storage::new(config)?),

            #[cfg(not(feature = "storage-s3"))]
            BackendKind::S3Like => {
                return Err(StorageError::ConfigError(
                    "s3-like object storage not available (storage-s3 feature not enabled)"
                        .to_string(),
                ))
            }

            #[cfg(feature = "storage-local")]
            BackendKind::Local => Backend::Local(LocalStorage::new(config.path()).await?),

            #[cfg(not(feature = "storage-local"))]
            BackendKind::Local => {
                return Err(StorageError::ConfigError(
                    "Local object storage not available (storage-local feature not enabled)"
                        .to_string(),
                ))
            }

            BackendKind::Disabled => Backend::Disabled,
        };

        tracing::info!(kind = %kind, "Object storage initialized");

        Ok(ObjectStorage { backend })
    }

    /// A facade with no backend; every operation fails with
    /// [`StorageError::UnsupportedOperation`].
    pub fn disabled() -> Self {
        ObjectStorage {
            backend: Backend::Disabled,
        }
    }

    fn unsupported(&self, operation: &'static str) -> StorageError {
        StorageError::UnsupportedOperation {
            operation,
            kind: self.backend_kind(),
        }
    }
}

#[cfg(feature = "storage-s3")]
impl From<S3Storage> for ObjectStorage {
    fn from(storage: S3Storage) -> Self {
        ObjectStorage {
            backend: Backend::S3(storage),
        }
    }
}

#[cfg(feature = "storage-local")]
impl From<LocalStorage> for ObjectStorage {
    fn from(storage: LocalStorage) -> Self {
        ObjectStorage {
            backend: Backend::Local(storage),
        }
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    async fn save(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
        content: Bytes,
        expiry: Duration,
    ) -> StorageResult<()> {
        match &self.backend {
            #[cfg(feature = "storage-s3")]
            Backend::S3(s3) => s3.save(ctx, directory, filename, content, expiry).await,
            #[cfg(feature = "storage-local")]
            Backend::Local(local) => local.save(ctx, directory, filename, content, expiry).await,
            Backend::Disabled => Err(self.unsupported("save")),
        }
    }

    fn get_url(
        &self,
        directory: &str,
        filename: &str,
        url_expiry: Duration,
    ) -> StorageResult<Url> {
        match &self.backend {
            #[cfg(feature = "storage-s3")]
            Backend::S3(s3) => s3.get_url(directory, filename, url_expiry),
            #[cfg(feature = "storage-local")]
            Backend::Local(local) => local.get_url(directory, filename, url_expiry),
            Backend::Disabled => Err(self.unsupported("get_url")),
        }
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
    ) -> StorageResult<()> {
        match &self.backend {
            #[cfg(feature = "storage-s3")]
            Backend::S3(s3) => s3.delete(ctx, directory, filename).await,
            #[cfg(feature = "storage-local")]
            Backend::Local(local) => local.delete(ctx, directory, filename).await,
            Backend::Disabled => Err(self.unsupported("delete")),
        }
    }

    fn backend_kind(&self) -> BackendKind {
        match &self.backend {
            #[cfg(feature = "storage-s3")]
            Backend::S3(_) => BackendKind::S3Like,
            #[cfg(feature = "storage-local")]
            Backend::Local(_) => BackendKind::Local,
            Backend::Disabled => BackendKind::Disabled,
        }
    }
}

/// Create a storage backend based on configuration
pub async fn create_storage(config: StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    let storage = ObjectStorage::new(config).await?;
    Ok(Arc::new(storage))
}
