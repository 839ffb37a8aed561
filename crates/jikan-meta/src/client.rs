//! Jikan API client.

use crate::types::{AnimeEntry, SearchResponse};
use anyhow::{Context, Result};
use reqwest::Client;
use shared::SeriesInfo;
use std::time::Duration;
use tracing::{debug, warn};

/// Synopsis is clipped to keep captions and posts short.
const SYNOPSIS_LIMIT: usize = 250;
/// Only the leading genres are kept.
const GENRE_LIMIT: usize = 3;

/// Jikan API v4 client
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("anime-batch-factory/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Look up series metadata by name.
    ///
    /// Never fails: HTTP errors, bad JSON, or an empty result set all degrade
    /// to fallback metadata built from the query string.
    pub async fn search(&self, query: &str) -> SeriesInfo {
        match self.try_search(query).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                debug!(query, "No metadata hits, using fallback");
                SeriesInfo::fallback(query)
            }
            Err(e) => {
                warn!(query, error = %e, "Metadata lookup failed, using fallback");
                SeriesInfo::fallback(query)
            }
        }
    }

    async fn try_search(&self, query: &str) -> Result<Option<SeriesInfo>> {
        let url = format!("{}/anime", self.base_url);

        debug!(query, "Searching Jikan");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("limit", "1")])
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search returned an error status")?;

        let results: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(results.data.into_iter().next().map(entry_to_info))
    }
}

/// Map a search hit onto the five fields the pipeline consumes.
fn entry_to_info(entry: AnimeEntry) -> SeriesInfo {
    let genres = entry
        .genres
        .iter()
        .take(GENRE_LIMIT)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let synopsis = match entry.synopsis {
        Some(text) => clip(&text, SYNOPSIS_LIMIT),
        None => "N/A".to_string(),
    };

    SeriesInfo {
        title: entry.title,
        score: entry
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        media_type: entry.anime_type.unwrap_or_else(|| "TV".to_string()),
        genres,
        synopsis,
        poster: entry.images.jpg.large_image_url,
    }
}

/// Truncate at a character boundary, appending an ellipsis when clipped.
fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit).collect();
    clipped.push_str("...");
    clipped
}
