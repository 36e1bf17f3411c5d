//! Naming and publishing finished episodes into the output directory.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, warn};

use super::error::PublishError;

/// Characters that are replaced in titles before they become file names.
pub const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Marker inserted into names of loudness-normalized episodes.
pub const NORMALIZED_MARKER: &str = "_NORM_";

/// Title used when nothing usable is left after sanitizing.
const FALLBACK_TITLE: &str = "untitled";

/// Upper bound on `_2`, `_3`, ... suffixes tried on name collisions.
const MAX_NAME_ATTEMPTS: u32 = 1000;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Replaces every reserved or control character with `-`.
///
/// Each replaced character maps to exactly one `-`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect()
}

/// Sanitizes a title and truncates it to `max_chars` characters.
pub fn episode_title(title: &str, max_chars: usize) -> String {
    let sanitized = sanitize_filename(title.trim());
    let truncated: String = sanitized.chars().take(max_chars).collect();
    let truncated = truncated.trim();
    if truncated.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        truncated.to_string()
    }
}

/// Builds the file stem `{title}_{timestamp}` or `{title}_NORM_{timestamp}`.
pub fn episode_stem(title: &str, normalized: bool, timestamp: DateTime<Local>) -> String {
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    if normalized {
        format!("{}{}{}", title, NORMALIZED_MARKER, stamp)
    } else {
        format!("{}_{}", title, stamp)
    }
}

/// A file that landed in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedEpisode {
    /// File name relative to the output directory.
    pub file_name: String,
    /// Full path of the published file.
    #[serde(skip)]
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Whether loudness normalization was applied.
    pub normalized: bool,
}

/// Copies finished audio into the output directory.
#[derive(Debug, Clone)]
pub struct Publisher {
    output_dir: PathBuf,
    buffer_size: usize,
}

impl Publisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            buffer_size: COPY_BUFFER_SIZE,
        }
    }

    /// Publishes `source` under `{stem}.mp3`, or `{stem}_N.mp3` if taken.
    ///
    /// Never overwrites an existing file. A partially written destination is
    /// removed before the error is returned.
    pub async fn publish(
        &self,
        source: &Path,
        stem: &str,
        normalized: bool,
    ) -> Result<PublishedEpisode, PublishError> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PublishError::OutputDirectory {
                path: self.output_dir.clone(),
                source: e,
            })?;

        let (dest_file, destination) = self.create_destination(stem).await?;

        match self.copy_into(source, dest_file, &destination).await {
            Ok(size_bytes) => {
                let file_name = destination
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(
                    "Published {} ({} bytes) to {}",
                    file_name,
                    size_bytes,
                    destination.display()
                );
                Ok(PublishedEpisode {
                    file_name,
                    path: destination,
                    size_bytes,
                    normalized,
                })
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&destination).await {
                    warn!(
                        "Failed to remove partial file {}: {}",
                        destination.display(),
                        remove_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Atomically claims a free destination name.
    async fn create_destination(&self, stem: &str) -> Result<(File, PathBuf), PublishError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = if attempt == 1 {
                format!("{}.mp3", stem)
            } else {
                format!("{}_{}.mp3", stem, attempt)
            };
            let path = self.output_dir.join(name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((file, path)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(PublishError::CreateFailed { path, source: e }),
            }
        }

        Err(PublishError::NameExhausted {
            stem: stem.to_string(),
        })
    }

    /// Copies `source` into the already-open destination and verifies it.
    async fn copy_into(
        &self,
        source: &Path,
        dest_file: File,
        destination: &Path,
    ) -> Result<u64, PublishError> {
        let copy_failed =
            |e| PublishError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e);

        let source_file = File::open(source).await.map_err(copy_failed)?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(copy_failed)?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(copy_failed)?;
            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(copy_failed)?;
        writer.into_inner().sync_all().await.map_err(copy_failed)?;

        let written = fs::metadata(destination).await.map_err(copy_failed)?.len();
        if written == 0 {
            return Err(PublishError::EmptyFile {
                path: destination.to_path_buf(),
            });
        }
        if written != total_bytes {
            warn!(
                "Size mismatch publishing {}: copied {} bytes, found {}",
                destination.display(),
                total_bytes,
                written
            );
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_sanitize_replaces_each_reserved_char() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a-b-c-d");
        assert_eq!(sanitize_filename("/\\:*?\"<>|"), "---------");
        assert_eq!(sanitize_filename("Plain title"), "Plain title");
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("Café: día?"), "Café- día-");
    }

    #[test]
    fn test_episode_title_truncates_by_chars() {
        let long = "é".repeat(150);
        let title = episode_title(&long, 100);
        assert_eq!(title.chars().count(), 100);
    }

    #[test]
    fn test_episode_title_fallback() {
        assert_eq!(episode_title("   ", 100), "untitled");
        assert_eq!(episode_title("", 100), "untitled");
    }

    #[test]
    fn test_episode_stem() {
        assert_eq!(
            episode_stem("Talk", false, fixed_time()),
            "Talk_20240309_140507"
        );
        assert_eq!(
            episode_stem("Talk", true, fixed_time()),
            "Talk_NORM_20240309_140507"
        );
    }

    #[tokio::test]
    async fn test_publish_copies_file() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = work.path().join("converted.mp3");
        tokio::fs::write(&source, b"ID3 fake audio").await.unwrap();

        let publisher = Publisher::new(out.path());
        let episode = publisher.publish(&source, "Talk_20240309_140507", false).await.unwrap();

        assert_eq!(episode.file_name, "Talk_20240309_140507.mp3");
        assert_eq!(episode.size_bytes, 14);
        assert!(!episode.normalized);
        assert_eq!(tokio::fs::read(&episode.path).await.unwrap(), b"ID3 fake audio");
    }

    #[tokio::test]
    async fn test_publish_never_overwrites() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = work.path().join("converted.mp3");
        tokio::fs::write(&source, b"new").await.unwrap();
        tokio::fs::write(out.path().join("Talk.mp3"), b"old").await.unwrap();

        let publisher = Publisher::new(out.path());
        let first = publisher.publish(&source, "Talk", false).await.unwrap();
        let second = publisher.publish(&source, "Talk", false).await.unwrap();

        assert_eq!(first.file_name, "Talk_2.mp3");
        assert_eq!(second.file_name, "Talk_3.mp3");
        assert_eq!(
            tokio::fs::read(out.path().join("Talk.mp3")).await.unwrap(),
            b"old"
        );
    }

    #[tokio::test]
    async fn test_publish_empty_source_leaves_nothing() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = work.path().join("converted.mp3");
        tokio::fs::write(&source, b"").await.unwrap();

        let publisher = Publisher::new(out.path());
        let err = publisher.publish(&source, "Empty", false).await.unwrap_err();

        assert!(matches!(err, PublishError::EmptyFile { .. }));
        assert!(!out.path().join("Empty.mp3").exists());
    }

    #[tokio::test]
    async fn test_publish_missing_source_leaves_nothing() {
        let out = TempDir::new().unwrap();
        let publisher = Publisher::new(out.path());
        let err = publisher
            .publish(Path::new("/nonexistent/converted.mp3"), "Gone", false)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::CopyFailed { .. }));
        assert!(!out.path().join("Gone.mp3").exists());
    }

    #[tokio::test]
    async fn test_publish_creates_output_dir() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let nested = out.path().join("feed").join("mp3s");
        let source = work.path().join("converted.mp3");
        tokio::fs::write(&source, b"audio").await.unwrap();

        let publisher = Publisher::new(&nested);
        let episode = publisher.publish(&source, "Talk", true).await.unwrap();

        assert!(episode.normalized);
        assert!(nested.join("Talk.mp3").exists());
    }
}
