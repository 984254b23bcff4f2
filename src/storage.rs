use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::wardrobe::category::Category;

/// File placement used by the upload pipeline. Keys are bare file names.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Writes `body` into the upload area. A partially written file is removed
    /// before the error is returned.
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<PathBuf>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// Moves an object out of the upload area into the category's folder.
    async fn promote(&self, key: &str, category: Category) -> anyhow::Result<PathBuf>;
}

#[derive(Clone, Debug)]
pub struct LocalStorage {
    upload_dir: PathBuf,
    wardrobe_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, wardrobe_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            wardrobe_dir: wardrobe_dir.into(),
        }
    }

    /// Creates the upload directory and every category folder.
    pub async fn ensure_layout(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("create {}", self.upload_dir.display()))?;
        for category in Category::ALL {
            let dir = self.category_dir(category);
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.wardrobe_dir.join(category.folder())
    }

    fn upload_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(is_plain_file_name(key), "invalid object key {:?}", key);
        Ok(self.upload_dir.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<PathBuf> {
        let path = self.upload_path(key)?;
        if let Err(e) = tokio::fs::write(&path, &body).await {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = %cleanup, path = %path.display(), "remove partial upload failed");
                }
            }
            return Err(e).with_context(|| format!("write {}", path.display()));
        }
        debug!(path = %path.display(), bytes = body.len(), "upload stored");
        Ok(path)
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.upload_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    async fn promote(&self, key: &str, category: Category) -> anyhow::Result<PathBuf> {
        let from = self.upload_path(key)?;
        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;
        let to = dir.join(key);
        move_file(&from, &to).await?;
        debug!(from = %from.display(), to = %to.display(), "object promoted");
        Ok(to)
    }
}

/// `rename`, falling back to copy + remove when the directories live on
/// different filesystems.
async fn move_file(from: &Path, to: &Path) -> anyhow::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
    tokio::fs::remove_file(from)
        .await
        .with_context(|| format!("remove {}", from.display()))?;
    Ok(())
}

fn is_plain_file_name(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(|c: char| c == '/' || c == '\\')
}
