//! Stowage Storage Library
//!
//! Uniform save / get-url / delete over an S3-compatible object store or a
//! local directory tree.
//!
//! # Object addressing
//!
//! Objects are addressed by `(directory, filename)`:
//!
//! - **S3-like**: key `{directory}/{filename}` in the configured bucket
//! - **Local**: file `{root}/{directory}/{filename}`
//!
//! URLs for the S3-like backend are presigned offline against the CDN host
//! (see [`signer`]); local URLs use the `file://` scheme.

pub mod client;
pub mod context;
pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signer;
pub mod traits;

// Re-export commonly used types
pub use client::{ClientError, ObjectClient, PutObject};
#[cfg(feature = "storage-s3")]
pub use client::AwsS3Client;
pub use context::RequestContext;
pub use factory::{create_storage, ObjectStorage};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signer::{Clock, FixedClock, SystemClock};
pub use stowage_core::{BackendKind, StorageConfig};
pub use traits::{Storage, StorageError, StorageResult};
