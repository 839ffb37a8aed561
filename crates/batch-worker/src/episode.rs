//! Per-episode state machine.
//!
//! Drives one episode through acquisition, optional dual-track
//! verification/merge, finalize-naming, and upload, for one resolution.
//! Every failure is soft: the episode simply contributes no reference id
//! and the batch moves on.

use crate::acquire::{Acquirer, AudioTrack};
use crate::media::MediaToolkit;
use crate::notify::Notifier;
use crate::resolve::{sibling, FileResolver, SUB_MARKER};
use crate::upload::Uploader;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Tracks are aligned iff their duration gap is strictly below this.
/// An unknown duration (0.0) almost always lands on the desync side, which is
/// the safe default: a subtitled-only upload beats a bad merge.
pub const SYNC_TOLERANCE_SECS: f64 = 2.0;

/// Per-episode result. Transient; only the reference id survives into the
/// batch aggregate.
#[derive(Debug, Default)]
pub struct EpisodeOutcome {
    pub file_id: Option<i64>,
    pub dual_merged: bool,
}

/// One episode's worth of pipeline, wired to its collaborators.
pub struct EpisodeUnit<'a> {
    pub series: &'a str,
    /// Display title used in upload captions (from metadata, not the query).
    pub title: &'a str,
    pub resolution: &'a str,
    pub dual_requested: bool,
    pub acquirer: &'a dyn Acquirer,
    pub resolver: &'a FileResolver,
    pub media: &'a dyn MediaToolkit,
    pub uploader: &'a dyn Uploader,
    pub notifier: &'a dyn Notifier,
}

impl EpisodeUnit<'_> {
    /// Run the state machine for one episode.
    pub async fn run(&self, episode: u32) -> EpisodeOutcome {
        info!(
            series = self.series,
            episode,
            resolution = self.resolution,
            "Processing episode"
        );

        // Acquire the subtitled track
        if let Err(e) = self
            .acquirer
            .fetch(self.series, episode, self.resolution, AudioTrack::Primary)
            .await
        {
            warn!(episode, error = %e, "Primary acquisition errored");
        }

        let found = match self.resolver.resolve(episode) {
            Some(path) => path,
            None => {
                self.notifier
                    .notify(&format!(
                        "Failed to download Ep {} ({}p)",
                        episode, self.resolution
                    ))
                    .await;
                return EpisodeOutcome::default();
            }
        };

        // Claim the file so later resolver calls cannot re-pick it
        let sub_path = claim_sub(&found);
        if let Err(e) = fs::rename(&found, &sub_path) {
            warn!(episode, error = %e, "Failed to claim subtitled file");
            return EpisodeOutcome::default();
        }

        let mut final_path = sub_path.clone();
        let mut merged = false;

        if self.dual_requested {
            if let Some(out) = self.try_dual(episode, &sub_path).await {
                final_path = out;
                merged = true;
            }
        }

        // Finalize naming on the sub-only path; a no-op once merged
        if !merged && has_sub_marker(&final_path) {
            let clean = finalized_sub(&final_path);
            match fs::rename(&final_path, &clean) {
                Ok(()) => final_path = clean,
                Err(e) => debug!(episode, error = %e, "Finalize rename failed"),
            }
        }

        self.upload(episode, &final_path, merged).await
    }

    /// Attempt the dubbed track; returns the merged output path on success.
    async fn try_dual(&self, episode: u32, sub_path: &Path) -> Option<PathBuf> {
        if let Err(e) = self
            .acquirer
            .fetch(self.series, episode, self.resolution, AudioTrack::Alternate)
            .await
        {
            warn!(episode, error = %e, "Alternate acquisition errored");
        }

        let dub_path = match self.resolver.resolve(episode) {
            // An identical path means the acquirer silently reused the sub output
            Some(path) if path != sub_path => path,
            _ => {
                self.notifier
                    .notify(&format!("No dub found for Ep {}, uploading sub track", episode))
                    .await;
                return None;
            }
        };

        let dur_sub = self.media.duration(sub_path).await;
        let dur_dub = self.media.duration(&dub_path).await;
        let gap = (dur_sub - dur_dub).abs();

        if gap >= SYNC_TOLERANCE_SECS {
            self.notifier
                .notify(&format!(
                    "Desync risk on Ep {}: {:.2}s gap, uploading sub track",
                    episode, gap
                ))
                .await;
            best_effort_remove(&dub_path);
            return None;
        }

        let out = dual_output(sub_path);
        if self.media.mux_dual_audio(sub_path, &dub_path, &out).await {
            info!(episode, out = %out.display(), "Dual-audio merge complete");
            best_effort_remove(sub_path);
            best_effort_remove(&dub_path);
            Some(out)
        } else {
            // Dubbed intermediate is left in place for manual inspection
            self.notifier
                .notify(&format!("Mux failed for Ep {}, uploading sub track", episode))
                .await;
            None
        }
    }

    async fn upload(&self, episode: u32, final_path: &Path, merged: bool) -> EpisodeOutcome {
        if !final_path.exists() {
            warn!(episode, path = %final_path.display(), "Final file missing, nothing to upload");
            return EpisodeOutcome::default();
        }

        let mut caption = format!(
            "{} - Episode {} [{}p]",
            self.title, episode, self.resolution
        );
        if merged {
            caption.push_str(" [Dual Audio]");
        }

        match self.uploader.upload(final_path, &caption).await {
            Ok(id) => {
                info!(episode, file_id = id, "Episode uploaded");
                best_effort_remove(final_path);
                EpisodeOutcome {
                    file_id: Some(id),
                    dual_merged: merged,
                }
            }
            Err(e) => {
                // Local file is kept so the episode can be salvaged by hand
                self.notifier
                    .notify(&format!("Upload failed for Ep {}: {:#}", episode, e))
                    .await;
                EpisodeOutcome {
                    file_id: None,
                    dual_merged: merged,
                }
            }
        }
    }
}

fn best_effort_remove(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Cleanup failed");
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn has_sub_marker(path: &Path) -> bool {
    file_name(path).contains(SUB_MARKER)
}

/// `X.mp4` -> `X_sub.mp4`
fn claim_sub(path: &Path) -> PathBuf {
    let name = file_name(path);
    let stem = name.strip_suffix(".mp4").unwrap_or(name);
    sibling(path, &format!("{}{}.mp4", stem, SUB_MARKER))
}

/// `X_sub.mp4` -> `X [Dual].mkv`
fn dual_output(sub_path: &Path) -> PathBuf {
    let name = file_name(sub_path);
    let stem = name.strip_suffix("_sub.mp4").unwrap_or(name);
    sibling(sub_path, &format!("{} [Dual].mkv", stem))
}

/// `X_sub.mp4` -> `X [Sub].mp4`
fn finalized_sub(sub_path: &Path) -> PathBuf {
    let name = file_name(sub_path);
    let stem = name.strip_suffix("_sub.mp4").unwrap_or(name);
    sibling(sub_path, &format!("{} [Sub].mp4", stem))
}
