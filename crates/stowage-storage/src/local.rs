use crate::context::RequestContext;
use crate::keys::local_path;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::BackendKind;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// `root` is created recursively if missing and made absolute, so every
    /// URL this backend produces is `file://<absolute-path>`.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root: PathBuf = root.into();
        let root = std::path::absolute(root)?;

        fs::create_dir_all(&root).await?;

        tracing::debug!(root = %root.display(), "Local object storage ready");

        Ok(LocalStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `dir`, then write `path` through a temporary sibling that is
    /// renamed into place once synced.
    async fn write_file(&self, dir: &Path, path: &Path, content: &[u8]) -> StorageResult<()> {
        fs::create_dir_all(dir).await?;

        let tmp = temp_path(path);
        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(content).await?;
            file.sync_all().await?;
            fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{}.{}.{}.part",
        name,
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
        content: Bytes,
        _expiry: Duration,
    ) -> StorageResult<()> {
        let dir = local_path(&self.root, directory, "")?;
        let path = local_path(&self.root, directory, filename)?;
        let size = content.len();
        let start = std::time::Instant::now();

        ctx.run("save", self.write_file(&dir, &path, &content))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage save failed"
                );
                e
            })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(())
    }

    fn get_url(
        &self,
        directory: &str,
        filename: &str,
        _url_expiry: Duration,
    ) -> StorageResult<Url> {
        let path = local_path(&self.root, directory, filename)?;
        Url::from_file_path(&path).map_err(|_| {
            StorageError::InvalidKey(format!("{} is not a valid file URL path", path.display()))
        })
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        directory: &str,
        filename: &str,
    ) -> StorageResult<()> {
        let path = local_path(&self.root, directory, filename)?;
        let start = std::time::Instant::now();

        ctx.run("delete", async {
            fs::remove_file(&path).await.map_err(StorageError::from)
        })
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path.display(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local storage delete failed"
            );
            e
        })?;

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Local
    }
}
