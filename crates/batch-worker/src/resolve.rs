//! Locating freshly downloaded episode files.
//!
//! The downloader deposits a file of unpredictable exact name somewhere under
//! the working tree. Disambiguating "the file just produced" from stale or
//! already-finalized files of the same episode requires recency plus
//! exclusion-pattern filtering. The strictly sequential episode loop is what
//! keeps this heuristic safe.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Intermediate marker for a claimed subtitled file.
pub const SUB_MARKER: &str = "_sub";
/// Intermediate marker for a claimed dubbed file.
pub const DUB_MARKER: &str = "_dual";
/// Finalized single-track output tag.
pub const SUB_TAG: &str = "[Sub]";
/// Finalized dual-audio output tag.
pub const DUAL_TAG: &str = "[Dual]";

/// Finds the newest unprocessed download for an episode.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the most recent unclaimed `.mp4` for the given episode.
    ///
    /// Returns `None` when no unprocessed candidate exists; that is the
    /// normal "download failed" signal, not an error.
    pub fn resolve(&self, episode: u32) -> Option<PathBuf> {
        let mut best: Option<(SystemTime, PathBuf)> = None;

        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            if !is_candidate(name, episode) {
                continue;
            }

            let created = entry
                .metadata()
                .ok()
                .and_then(|m| m.created().or_else(|_| m.modified()).ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            match &best {
                Some((best_time, _)) if *best_time >= created => {}
                _ => best = Some((created, path.to_path_buf())),
            }
        }

        let found = best.map(|(_, path)| path);
        debug!(episode, found = ?found, "Resolved episode download");
        found
    }
}

/// A candidate names this exact episode, is an .mp4, and carries no
/// processed-output marker.
fn is_candidate(name: &str, episode: u32) -> bool {
    if !name.ends_with(".mp4") {
        return false;
    }
    if name.contains(SUB_MARKER)
        || name.contains(DUB_MARKER)
        || name.contains(SUB_TAG)
        || name.contains(DUAL_TAG)
    {
        return false;
    }
    names_episode(name, episode)
}

/// True iff the name contains `Episode <n>` with the number not running into
/// further digits, so episode 1 does not match "Episode 10".
fn names_episode(name: &str, episode: u32) -> bool {
    let needle = format!("Episode {}", episode);
    let mut search_from = 0;
    while let Some(idx) = name[search_from..].find(&needle) {
        let end = search_from + idx + needle.len();
        match name[end..].chars().next() {
            Some(c) if c.is_ascii_digit() => search_from = end,
            _ => return true,
        }
    }
    false
}

/// Swap the file name, keeping the parent directory.
pub fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
