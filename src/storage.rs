use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Writes `body` under `key` and returns the path recorded for it.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<String>;
}

/// Stores objects as plain files below a root directory.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        let name = Path::new(key)
            .file_name()
            .with_context(|| format!("invalid object key {:?}", key))?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create dir {}", self.root.display()))?;

        let path = self.root.join(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        debug!(path = %path.display(), bytes = body.len(), content_type, "object stored");
        Ok(path.to_string_lossy().into_owned())
    }
}
