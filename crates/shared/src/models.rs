//! Data models for the batch factory.
//!
//! This module defines the structures flowing through the pipeline: the parsed
//! batch request, series metadata, and the durable pending-post job record.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One user-issued batch intent.
///
/// Episodes are sorted ascending and deduplicated; resolutions keep the order
/// given in the request, which also governs cooldown sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub series: String,
    pub episodes: Vec<u32>,
    pub resolutions: Vec<String>,
    pub dual_audio: bool,
}

/// Series metadata consumed by the post record.
///
/// Every field degrades gracefully: a failed lookup yields defaults built
/// from the search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub title: String,
    pub score: String,
    pub media_type: String,
    pub genres: String,
    pub synopsis: String,
    pub poster: Option<String>,
}

impl SeriesInfo {
    /// Fallback metadata when the lookup produced nothing usable.
    pub fn fallback(query: &str) -> Self {
        Self {
            title: query.to_string(),
            score: "N/A".to_string(),
            media_type: "TV".to_string(),
            genres: String::new(),
            synopsis: String::new(),
            poster: None,
        }
    }
}

/// Lifecycle status of a pending post.
///
/// This core only ever writes `PendingPost`; downstream publication owns the
/// transition to `Posted`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    PendingPost,
    Posted,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::PendingPost => write!(f, "pending_post"),
            PostStatus::Posted => write!(f, "posted"),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_post" => Ok(PostStatus::PendingPost),
            "posted" => Ok(PostStatus::Posted),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

/// One durable unit per (batch, resolution), awaiting downstream publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostJob {
    pub id: Option<i64>, // Database ID (None before insertion)

    // Series metadata
    pub anime: String,
    pub poster: Option<String>,
    pub synopsis: String,
    pub genres: String,
    pub score: String,
    pub media_type: String,

    // Batch result
    pub resolution: String,
    pub file_ids: Vec<i64>, // insertion order = episode completion order
    pub range_start: i64,
    pub range_end: i64,
    pub dual_audio: bool, // requested, not per-file achieved

    pub status: PostStatus,
    pub timestamp: f64, // epoch seconds
}

impl PostJob {
    /// Build a record from a finished resolution pass.
    ///
    /// `file_ids` must be non-empty: a batch with zero successful uploads
    /// produces no record at all.
    pub fn new(
        info: &SeriesInfo,
        resolution: &str,
        file_ids: Vec<i64>,
        dual_audio: bool,
    ) -> Result<Self> {
        let (first, last) = match (file_ids.first(), file_ids.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => anyhow::bail!("Post job requires at least one uploaded file"),
        };

        Ok(Self {
            id: None,
            anime: info.title.clone(),
            poster: info.poster.clone(),
            synopsis: info.synopsis.clone(),
            genres: info.genres.clone(),
            score: info.score.clone(),
            media_type: info.media_type.clone(),
            resolution: resolution.to_string(),
            range_start: first,
            range_end: last,
            file_ids,
            dual_audio,
            status: PostStatus::PendingPost,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        })
    }
}
