//! Trait definitions for the external tool adapters.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ToolError;

/// Fetches media and metadata for a source URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Resolves the display title of the source.
    async fn resolve_title(&self, url: &str) -> Result<String, ToolError>;

    /// Approximate content size in bytes.
    ///
    /// `None` means the size is unknown; callers treat that as "allowed".
    async fn probe_size(&self, url: &str) -> Option<u64>;

    /// Downloads the best available audio into `dest_dir`.
    ///
    /// Every line the tool prints is sent to `lines` as it arrives. The sender
    /// is dropped when the tool exits, so the receiver sees the end of output.
    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        lines: mpsc::UnboundedSender<String>,
    ) -> Result<(), ToolError>;
}

/// Encodes and post-processes audio files.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Encodes `input` into the target MP3 format at `output`.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    /// Encodes `input` with loudness normalization applied.
    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    /// Duration of a media file in seconds, if it can be determined.
    async fn probe_duration(&self, path: &Path) -> Option<f64>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), ToolError>;
}
