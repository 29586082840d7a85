//! Release-title quality inference.
//!
//! Indexers return bare release names; the resolution, source and codec are
//! inferred from the title text with a fixed vocabulary. Matching is
//! case-insensitive and first-hit-wins within each axis.

use serde::{Deserialize, Serialize};

/// Quality attributes inferred from a release title. Any axis the title does
/// not mention stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseQuality {
    pub resolution: Option<String>,
    pub source: Option<String>,
    pub codec: Option<String>,
}

impl ReleaseQuality {
    pub fn from_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        Self {
            resolution: infer_resolution(&lower),
            source: infer_source(&lower),
            codec: infer_codec(&lower),
        }
    }
}

fn infer_resolution(lower: &str) -> Option<String> {
    if lower.contains("2160p") || lower.contains("4k") || lower.contains("uhd") {
        Some("2160p".to_string())
    } else if lower.contains("1080p") {
        Some("1080p".to_string())
    } else if lower.contains("720p") {
        Some("720p".to_string())
    } else if lower.contains("576p") {
        Some("576p".to_string())
    } else if lower.contains("480p") {
        Some("480p".to_string())
    } else {
        None
    }
}

fn infer_source(lower: &str) -> Option<String> {
    if lower.contains("bluray")
        || lower.contains("blu-ray")
        || lower.contains("bdrip")
        || lower.contains("brrip")
    {
        Some("BluRay".to_string())
    } else if lower.contains("web-dl") || lower.contains("webdl") {
        Some("WEB-DL".to_string())
    } else if lower.contains("webrip") || lower.contains("web-rip") {
        Some("WEBRip".to_string())
    } else if lower.contains("hdtv") {
        Some("HDTV".to_string())
    } else if lower.contains("dvdrip") || lower.contains("dvd") {
        Some("DVD".to_string())
    } else {
        None
    }
}

fn infer_codec(lower: &str) -> Option<String> {
    if lower.contains("x265") || lower.contains("h265") || lower.contains("hevc") {
        Some("x265".to_string())
    } else if lower.contains("x264") || lower.contains("h264") || lower.contains("avc") {
        Some("x264".to_string())
    } else if lower.contains("xvid") {
        Some("XviD".to_string())
    } else {
        None
    }
}
