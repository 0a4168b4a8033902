//! Stowage Core Library
//!
//! Backend configuration shared by the storage layer and the binaries that
//! construct it. Loading (environment, `.env`, serde) happens here so the
//! storage crate only ever sees a finished, immutable [`StorageConfig`].

pub mod config;
pub mod storage_types;

// Re-export commonly used types
pub use config::StorageConfig;
pub use storage_types::{BackendKind, InvalidBackendKind};
