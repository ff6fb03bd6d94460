use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
}

/// Filesystem operations the session needs for its clip
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;

    async fn unlink(&self, path: &Path) -> Result<()>;

    async fn stat(&self, path: &Path) -> Result<FileStat>;

    /// Create the directory (and parents) if missing
    async fn ensure_dir(&self, path: &Path) -> Result<()>;
}

/// `FileStore` over the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

#[async_trait::async_trait]
impl FileStore for LocalFileStore {
    async fn exists(&self, path: &Path) -> Result<bool> {
        tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("Failed to check {}", path.display()))
    }

    async fn unlink(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to delete {}", path.display()))
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        Ok(FileStat {
            size: metadata.len(),
        })
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))
    }
}
