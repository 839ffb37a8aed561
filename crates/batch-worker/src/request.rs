//! Batch command parsing.
//!
//! Turns the raw user-issued command text into a structured [`BatchRequest`].
//! Shape: `-a "Series Name" -e 1-5,8 -r 720|all -dual`. A malformed or
//! missing episode spec is a hard rejection before any task registration.

use regex::Regex;
use shared::BatchRequest;
use thiserror::Error;

/// Resolution labels used when the `all` keyword is given, in processing order.
pub const RESOLUTION_PRESET: [&str; 3] = ["360", "720", "1080"];
/// Resolution used when the command names none.
pub const DEFAULT_RESOLUTION: &str = "720";

/// Rejections raised before a batch is registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("missing episode spec (-e)")]
    MissingEpisodes,
    #[error("invalid episode spec: {0}")]
    InvalidEpisodes(String),
    #[error("reversed episode range: {0}")]
    ReversedRange(String),
}

/// Parse a full batch command into a request.
pub fn parse_command(text: &str) -> Result<BatchRequest, RequestError> {
    let series = parse_series(text);
    let episodes = match episode_spec(text) {
        Some(spec) => parse_episodes(&spec)?,
        None => return Err(RequestError::MissingEpisodes),
    };

    Ok(BatchRequest {
        series,
        episodes,
        resolutions: parse_resolutions(text),
        dual_audio: text.contains("-dual"),
    })
}

fn parse_series(text: &str) -> String {
    let re = Regex::new(r#"-a\s+["']([^"']+)["']"#).unwrap();
    re.captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "Anime".to_string())
}

fn episode_spec(text: &str) -> Option<String> {
    let re = Regex::new(r"-e\s+([\d,-]+)").unwrap();
    re.captures(text).map(|c| c[1].to_string())
}

/// Parse an episode spec of comma-separated singles and inclusive `a-b`
/// ranges into a sorted, deduplicated list.
pub fn parse_episodes(spec: &str) -> Result<Vec<u32>, RequestError> {
    let mut episodes = Vec::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| RequestError::InvalidEpisodes(part.to_string()))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| RequestError::InvalidEpisodes(part.to_string()))?;
            if start == 0 {
                return Err(RequestError::InvalidEpisodes(part.to_string()));
            }
            if start > end {
                return Err(RequestError::ReversedRange(part.to_string()));
            }
            episodes.extend(start..=end);
        } else {
            let episode: u32 = part
                .parse()
                .map_err(|_| RequestError::InvalidEpisodes(part.to_string()))?;
            if episode == 0 {
                return Err(RequestError::InvalidEpisodes(part.to_string()));
            }
            episodes.push(episode);
        }
    }

    if episodes.is_empty() {
        return Err(RequestError::MissingEpisodes);
    }

    episodes.sort_unstable();
    episodes.dedup();
    Ok(episodes)
}

/// Map the resolution spec to an ordered label list.
///
/// A standalone `all` token anywhere in the command wins over an explicit
/// `-r` flag; otherwise `-r <label>` selects a single resolution, with a
/// fixed default when neither is present.
pub fn parse_resolutions(text: &str) -> Vec<String> {
    let all_re = Regex::new(r"(^|\s)all(\s|$)").unwrap();
    if all_re.is_match(text) {
        return RESOLUTION_PRESET.iter().map(|r| r.to_string()).collect();
    }

    let r_re = Regex::new(r"-r\s+(\d+)").unwrap();
    match r_re.captures(text) {
        Some(c) => vec![c[1].to_string()],
        None => vec![DEFAULT_RESOLUTION.to_string()],
    }
}
