//! Published episodes: listing and deletion over the output directory.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::NORMALIZED_MARKER;
use crate::tools::AudioTranscoder;

/// Errors from episode operations.
#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("Invalid filename: {name}")]
    InvalidName { name: String },

    #[error("Not an MP3 file: {name}")]
    NotMp3 { name: String },

    #[error("File {name:?} does not exist")]
    NotFound { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One published MP3 as seen in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    /// File name without the `.mp3` extension.
    pub title: String,
    /// File name relative to the output directory.
    pub file: String,
    /// `m:ss`, or `unknown` when the duration cannot be probed.
    pub duration: String,
    /// Modification time in RFC 2822 form.
    pub pub_date: String,
    pub size_bytes: u64,
    /// Whether the name carries the normalization marker.
    pub normalized: bool,
}

/// Formats seconds as `m:ss`; minutes are not wrapped into hours.
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(secs) if secs.is_finite() && secs >= 0.0 => {
            let total = secs as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => "unknown".to_string(),
    }
}

/// File name without its `.mp3` extension, matched case-insensitively.
fn mp3_stem(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(".mp3".len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, ext) = name.split_at(split);
    ext.eq_ignore_ascii_case(".mp3").then_some(stem)
}

/// Checks a client-supplied episode file name.
pub fn validate_episode_name(name: &str) -> Result<(), EpisodeError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(EpisodeError::InvalidName {
            name: name.to_string(),
        });
    }
    if mp3_stem(name).is_none() {
        return Err(EpisodeError::NotMp3 {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Read/delete view over the output directory.
pub struct EpisodeLibrary {
    output_dir: PathBuf,
    transcoder: Arc<dyn AudioTranscoder>,
}

impl EpisodeLibrary {
    pub fn new(output_dir: impl Into<PathBuf>, transcoder: Arc<dyn AudioTranscoder>) -> Self {
        Self {
            output_dir: output_dir.into(),
            transcoder,
        }
    }

    /// Lists every `*.mp3` in the output directory, sorted by file name.
    ///
    /// A missing directory yields an empty list. Unreadable entries are skipped.
    pub async fn list(&self) -> Result<Vec<Episode>, EpisodeError> {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file = entry.file_name().to_string_lossy().into_owned();
            if mp3_stem(&file).is_none() {
                continue;
            }
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => files.push((file, entry.path(), meta)),
                Ok(_) => {}
                Err(e) => warn!("Failed to stat {}: {}", entry.path().display(), e),
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut episodes = Vec::with_capacity(files.len());
        for (file, path, meta) in files {
            let pub_date = meta
                .modified()
                .map(|t| DateTime::<Local>::from(t).to_rfc2822())
                .unwrap_or_default();
            let duration = format_duration(self.transcoder.probe_duration(&path).await);

            episodes.push(Episode {
                title: mp3_stem(&file).unwrap_or(&file).to_string(),
                normalized: file.contains(NORMALIZED_MARKER),
                file,
                duration,
                pub_date,
                size_bytes: meta.len(),
            });
        }

        Ok(episodes)
    }

    /// Deletes one episode by file name.
    pub async fn delete(&self, name: &str) -> Result<(), EpisodeError> {
        validate_episode_name(name)?;

        let path = self.output_dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted episode: {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EpisodeError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
