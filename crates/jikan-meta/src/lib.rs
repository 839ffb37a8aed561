//! Jikan v4 metadata lookup.
//!
//! Enriches a batch with series metadata (title, score, type, genres,
//! synopsis, poster). Lookups are best-effort: any failure degrades to
//! defaults built from the search query, never failing the batch.

mod client;
mod types;

pub use client::JikanClient;
pub use types::{AnimeEntry, SearchResponse};
