use log::warn;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Local-disk media store. Paths handed in are always relative to the
/// configured root; the database rows carry the same relative paths.
#[derive(Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Public URL for a stored file.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub async fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.absolute(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(target, bytes).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let target = self.absolute(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(self.absolute(from), target).await?;
        self.prune_parent(from).await;
        Ok(())
    }

    /// Best-effort removal, used for cleanup after a transaction has already
    /// committed. Failures are logged, never surfaced.
    pub async fn remove(&self, path: &str) {
        if let Err(err) = fs::remove_file(self.absolute(path)).await {
            warn!("failed to remove media file {path}: {err}");
            return;
        }
        self.prune_parent(path).await;
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Each stored file lives in its own directory; drop it once empty.
    async fn prune_parent(&self, path: &str) {
        if let Some(parent) = Path::new(path).parent()
            && parent != Path::new("")
        {
            let _ = fs::remove_dir(self.root.join(parent)).await;
        }
    }
}
