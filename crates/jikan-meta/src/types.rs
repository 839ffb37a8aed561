//! Jikan API v4 response types.
//!
//! These types represent the JSON responses from the Jikan API, narrowed to
//! the fields this pipeline consumes.

use serde::{Deserialize, Serialize};

/// Search response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<AnimeEntry>,
}

/// One anime search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub mal_id: u32,
    pub title: String,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub score: Option<f64>,
    pub synopsis: Option<String>,
    #[serde(default)]
    pub genres: Vec<MalEntity>,
    pub images: AnimeImages,
}

/// MAL entity (genre, studio, producer, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: u32,
    pub name: String,
}

/// Anime images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeImages {
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}
