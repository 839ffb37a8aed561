//! Media probe and merge wrappers.
//!
//! Thin best-effort wrappers around ffprobe/ffmpeg. Neither wrapper fails the
//! caller: an unreadable duration becomes 0.0 (which the sync rule treats as
//! desynchronized), and merge success is judged purely by output existence.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// Duration probe and dual-audio merge, behind one seam for testing.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Playback duration in seconds; 0.0 means unknown/untrusted.
    async fn duration(&self, path: &Path) -> f64;

    /// Combine a subtitled and a dubbed file into one dual-audio container.
    /// Returns true iff the output file exists afterward.
    async fn mux_dual_audio(&self, sub: &Path, dub: &Path, out: &Path) -> bool;
}

/// Production toolkit shelling out to ffprobe/ffmpeg.
pub struct Ffmpeg;

#[async_trait]
impl MediaToolkit for Ffmpeg {
    async fn duration(&self, path: &Path) -> f64 {
        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await;

        let parsed = match output {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .trim()
                .parse::<f64>()
                .ok(),
            Ok(output) => {
                warn!(
                    path = %path.display(),
                    code = output.status.code().unwrap_or(-1),
                    "ffprobe exited non-zero"
                );
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to run ffprobe");
                None
            }
        };

        let duration = parsed.unwrap_or(0.0);
        debug!(path = %path.display(), duration, "Probed duration");
        duration
    }

    async fn mux_dual_audio(&self, sub: &Path, dub: &Path, out: &Path) -> bool {
        debug!(
            sub = %sub.display(),
            dub = %dub.display(),
            out = %out.display(),
            "Muxing dual audio"
        );

        // Video and default (Japanese) audio from the subbed source, second
        // audio track from the dub; everything stream-copied.
        let result = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(sub)
            .arg("-i")
            .arg(dub)
            .arg("-map")
            .arg("0:v")
            .arg("-map")
            .arg("0:a")
            .arg("-map")
            .arg("1:a")
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("copy")
            .arg("-disposition:a:0")
            .arg("default")
            .arg("-metadata:s:a:0")
            .arg("language=jpn")
            .arg("-metadata:s:a:0")
            .arg("title=Japanese")
            .arg("-metadata:s:a:1")
            .arg("language=eng")
            .arg("-metadata:s:a:1")
            .arg("title=English")
            .arg(out)
            .output()
            .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to run ffmpeg");
        }

        out.exists()
    }
}
