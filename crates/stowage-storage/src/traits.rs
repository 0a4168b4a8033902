//! Storage abstraction trait
//!
//! This module defines the Storage trait that every backend implements, plus
//! the error type shared by all of them.

use crate::client::ClientError;
use crate::context::RequestContext;
use crate::BackendKind;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use stowage_core::InvalidBackendKind;
use thiserror::Error;
use url::Url;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object storage type: {0}")]
    InvalidBackendKind(String),

    #[error("Failed to create bucket {bucket}: {source}")]
    BucketCreationFailed {
        bucket: String,
        #[source]
        source: ClientError,
    },

    #[error("IO error: {0}")]
    BackendIo(#[from] std::io::Error),

    #[error("Remote storage error: {0}")]
    Remote(#[from] ClientError),

    #[error("Operation {operation} not supported for object storage type {kind}")]
    UnsupportedOperation {
        operation: &'static str,
        kind: BackendKind,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },

    #[error("{operation} exceeded its deadline")]
    DeadlineExceeded { operation: &'static str },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<InvalidBackendKind> for StorageError {
    fn from(err: InvalidBackendKind) -> Self {
        StorageError::InvalidBackendKind(err.0)
    }
}

impl StorageError {
    /// True when the object (or file) the operation targeted does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::BackendIo(e) => e.kind() == std::io::ErrorKind::NotFound,
            StorageError::Remote(e) => matches!(e, ClientError::NotFound { .. }),
            _ => false,
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::BackendIo(_)
            | StorageError::DeadlineExceeded { .. }
            | StorageError::BucketCreationFailed { .. } => true,
            StorageError::Remote(e) => matches!(e, ClientError::Service { .. }),
            StorageError::InvalidBackendKind(_)
            | StorageError::UnsupportedOperation { .. }
            | StorageError::InvalidKey(_)
            | StorageError::Cancelled { .. }
            | StorageError::ConfigError(_) => false,
        }
    }

    /// Machine-readable error code (e.g., "BUCKET_CREATION_FAILED")
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::InvalidBackendKind(_) => "INVALID_BACKEND_KIND",
            StorageError::BucketCreationFailed { .. } => "BUCKET_CREATION_FAILED",
            StorageError::BackendIo(_) | StorageError::Remote(_) => "BACKEND_IO_ERROR",
            StorageError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            StorageError::InvalidKey(_) => "INVALID_KEY",
            StorageError::Cancelled { .. } => "CANCELLED",
            StorageError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            StorageError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Objects are addressed by `(directory, filename)`. `directory` may contain
/// `/` and acts as a hierarchical prefix.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `content` at `directory/filename`, replacing any existing object.
    ///
    /// `expiry` sets an object-level expiration (now + expiry) on backends that
    /// support it; zero means none. Backends without expiry ignore it.
    async fn save(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
        content: Bytes,
        expiry: Duration,
    ) -> StorageResult<()>;

    /// Build a URL for `directory/filename`, or for `directory` itself when
    /// `filename` is empty.
    ///
    /// Never performs I/O.
    fn get_url(&self, directory: &str, filename: &str, url_expiry: Duration)
        -> StorageResult<Url>;

    /// Remove exactly the object at `directory/filename`.
    async fn delete(&self, ctx: &RequestContext, directory: &str, filename: &str)
        -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_kind(&self) -> BackendKind;
}
