//! External downloader invocation.
//!
//! The downloader is a black box: it either deposits a media file under the
//! per-series working directory or produces nothing. Its exit code is logged
//! but never trusted; success is inferred from subsequent file presence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Which audio rendition to request from the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioTrack {
    /// Original-language audio, pairs with subtitles
    Primary,
    /// Translated (dubbed) audio
    Alternate,
}

impl AudioTrack {
    /// Language argument the downloader script expects.
    pub fn lang_arg(self) -> &'static str {
        match self {
            AudioTrack::Primary => "jpn",
            AudioTrack::Alternate => "eng",
        }
    }
}

/// Acquires one rendition of one episode.
#[async_trait]
pub trait Acquirer: Send + Sync {
    async fn fetch(
        &self,
        series: &str,
        episode: u32,
        resolution: &str,
        track: AudioTrack,
    ) -> Result<()>;
}

/// Production acquirer wrapping the downloader script.
pub struct ScriptAcquirer {
    script: PathBuf,
    work_dir: PathBuf,
}

impl ScriptAcquirer {
    pub fn new(script: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl Acquirer for ScriptAcquirer {
    async fn fetch(
        &self,
        series: &str,
        episode: u32,
        resolution: &str,
        track: AudioTrack,
    ) -> Result<()> {
        debug!(
            series,
            episode,
            resolution,
            lang = track.lang_arg(),
            "Invoking downloader"
        );

        let status = Command::new(&self.script)
            .arg("-a")
            .arg(series)
            .arg("-e")
            .arg(episode.to_string())
            .arg("-r")
            .arg(resolution)
            .arg("-o")
            .arg(track.lang_arg())
            .current_dir(&self.work_dir)
            .status()
            .await
            .with_context(|| format!("Failed to spawn downloader {}", self.script.display()))?;

        // Exit code is informational only; the file resolver decides success
        if !status.success() {
            warn!(
                series,
                episode,
                code = status.code().unwrap_or(-1),
                "Downloader exited non-zero"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_args() {
        assert_eq!(AudioTrack::Primary.lang_arg(), "jpn");
        assert_eq!(AudioTrack::Alternate.lang_arg(), "eng");
    }
}
