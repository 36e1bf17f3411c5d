//! Source URL validation.

use thiserror::Error;

/// Reasons a submission is refused before any session exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL is required")]
    Missing,

    #[error("Please provide a valid YouTube URL")]
    UnsupportedSource { url: String },
}

/// Substrings that mark a supported source anywhere in the URL.
const SUPPORTED_FRAGMENTS: &[&str] = &[
    "youtube.com/watch",
    "youtube.com/playlist",
    "youtube-nocookie.com/",
    "m.youtube.com/",
];

/// Prefixes of short links.
const SUPPORTED_PREFIXES: &[&str] = &["https://youtu.be/", "http://youtu.be/"];

/// Whether an already-trimmed URL is on the allow-list.
pub fn is_supported_source_url(url: &str) -> bool {
    SUPPORTED_FRAGMENTS.iter().any(|f| url.contains(f))
        || SUPPORTED_PREFIXES.iter().any(|p| url.starts_with(p))
}

/// Trims `url` and checks it against the allow-list.
pub fn validate_source_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::Missing);
    }
    if !is_supported_source_url(url) {
        return Err(ValidationError::UnsupportedSource {
            url: url.to_string(),
        });
    }
    Ok(url.to_string())
}
