//! File path utilities for the batch working tree.
//!
//! The external downloader deposits files under a per-series directory inside
//! the downloads root; finished uploads land in the archive directory.

use std::path::{Path, PathBuf};

/// File path manager for the batch working tree
#[derive(Debug, Clone)]
pub struct WorkPaths {
    root: PathBuf,
}

impl WorkPaths {
    /// Create a new WorkPaths with the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Downloads root: everything the external acquirer produces lands here
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Per-series working directory inside the downloads root
    pub fn series_dir(&self, series: &str) -> PathBuf {
        self.downloads_dir().join(sanitize_filename(series))
    }

    /// Archive directory for uploaded files
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    /// Durable post queue database
    pub fn posts_db(&self) -> PathBuf {
        self.root.join("posts.db")
    }

    /// Logs directory
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create all necessary directories
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.downloads_dir(),
            self.archive_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Sanitize a filename component by replacing invalid characters.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let paths = WorkPaths::new("/data");

        assert_eq!(paths.downloads_dir(), PathBuf::from("/data/downloads"));
        assert_eq!(
            paths.series_dir("Frieren"),
            PathBuf::from("/data/downloads/Frieren")
        );
        assert_eq!(paths.posts_db(), PathBuf::from("/data/posts.db"));
    }

    #[test]
    fn test_series_dir_is_sanitized() {
        let paths = WorkPaths::new("/data");
        assert_eq!(
            paths.series_dir("Re:Zero"),
            PathBuf::from("/data/downloads/Re_Zero")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("Fullmetal Alchemist: Brotherhood"),
            "Fullmetal Alchemist_ Brotherhood"
        );
        assert_eq!(sanitize_filename("Normal Title"), "Normal Title");
        assert_eq!(
            sanitize_filename("Title/with\\invalid:chars"),
            "Title_with_invalid_chars"
        );
    }
}
