//! Outbound delivery of finished files.
//!
//! The real delivery channel is an external collaborator; its contract is
//! narrow: given a local file and a caption, return a durable reference id.
//! The bundled implementation archives files on local disk.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// Delivers a file and yields a durable reference id.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path, caption: &str) -> Result<i64>;
}

/// Local-disk archive uploader.
///
/// Copies the file into the archive directory under an id-prefixed name and
/// records the caption in a sidecar next to it. The id doubles as the durable
/// reference returned to the orchestrator.
pub struct ArchiveUploader {
    dest: PathBuf,
}

impl ArchiveUploader {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

#[async_trait]
impl Uploader for ArchiveUploader {
    async fn upload(&self, path: &Path, caption: &str) -> Result<i64> {
        tokio::fs::create_dir_all(&self.dest)
            .await
            .with_context(|| format!("Failed to create archive dir {}", self.dest.display()))?;

        let id = Utc::now().timestamp_millis();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Upload source has no file name")?;

        let target = self.dest.join(format!("{}_{}", id, file_name));
        tokio::fs::copy(path, &target)
            .await
            .with_context(|| format!("Failed to archive {}", path.display()))?;

        let sidecar = self.dest.join(format!("{}.caption.txt", id));
        tokio::fs::write(&sidecar, caption)
            .await
            .with_context(|| format!("Failed to write caption for {}", target.display()))?;

        info!(id, target = %target.display(), "Archived upload");
        Ok(id)
    }
}
