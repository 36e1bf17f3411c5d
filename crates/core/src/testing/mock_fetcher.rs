//! Mock media fetcher for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::tools::{MediaFetcher, ToolError};

/// Name of the file the mock "downloads".
pub const MOCK_DOWNLOAD_NAME: &str = "mock-video.webm";

/// Mock implementation of the MediaFetcher trait.
///
/// Writes a small fake audio file on download and replays configured output
/// lines. Title lookup and download can be made to fail once.
///
/// # Example
///
/// ```rust,ignore
/// use tubecast_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_title("Episode 1").await;
/// fetcher.set_size(Some(600 * 1024 * 1024)).await;
///
/// // Pipeline runs ...
///
/// assert_eq!(fetcher.recorded_downloads().await.len(), 0);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    title: Arc<RwLock<String>>,
    size: Arc<RwLock<Option<u64>>>,
    lines: Arc<RwLock<Vec<String>>>,
    content: Arc<RwLock<Option<Vec<u8>>>>,
    title_error: Arc<RwLock<Option<ToolError>>>,
    download_error: Arc<RwLock<Option<ToolError>>>,
    lookup_duration_ms: Arc<RwLock<u64>>,
    download_duration_ms: Arc<RwLock<u64>>,
    downloads: Arc<RwLock<Vec<String>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            title: Arc::new(RwLock::new("Mock Video".to_string())),
            size: Arc::new(RwLock::new(Some(10 * 1024 * 1024))),
            lines: Arc::new(RwLock::new(vec![
                "[youtube] mock: Downloading webpage".to_string(),
                "[download]  50.0% of 1.00MiB at 1.00MiB/s ETA 00:01".to_string(),
                "[download] 100% of 1.00MiB in 00:01".to_string(),
            ])),
            content: Arc::new(RwLock::new(Some(b"mock audio data".to_vec()))),
            title_error: Arc::new(RwLock::new(None)),
            download_error: Arc::new(RwLock::new(None)),
            lookup_duration_ms: Arc::new(RwLock::new(0)),
            download_duration_ms: Arc::new(RwLock::new(0)),
            downloads: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the title returned by `resolve_title`.
    pub async fn set_title(&self, title: impl Into<String>) {
        *self.title.write().await = title.into();
    }

    /// Set the probed size. `None` simulates an unavailable probe.
    pub async fn set_size(&self, size: Option<u64>) {
        *self.size.write().await = size;
    }

    /// Set the output lines replayed during download.
    pub async fn set_lines(&self, lines: Vec<String>) {
        *self.lines.write().await = lines;
    }

    /// Set the downloaded file content. `None` makes the download leave no file.
    pub async fn set_content(&self, content: Option<Vec<u8>>) {
        *self.content.write().await = content;
    }

    /// Make the next title lookup fail.
    pub async fn set_title_error(&self, error: ToolError) {
        *self.title_error.write().await = Some(error);
    }

    /// Make the next download fail after replaying its lines.
    pub async fn set_download_error(&self, error: ToolError) {
        *self.download_error.write().await = Some(error);
    }

    /// Set the simulated title lookup duration.
    pub async fn set_lookup_duration(&self, duration: Duration) {
        *self.lookup_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Set the simulated download duration.
    pub async fn set_download_duration(&self, duration: Duration) {
        *self.download_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// URLs passed to `download`, in call order.
    pub async fn recorded_downloads(&self) -> Vec<String> {
        self.downloads.read().await.clone()
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_title(&self, _url: &str) -> Result<String, ToolError> {
        let duration_ms = *self.lookup_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        if let Some(err) = self.title_error.write().await.take() {
            return Err(err);
        }
        Ok(self.title.read().await.clone())
    }

    async fn probe_size(&self, _url: &str) -> Option<u64> {
        *self.size.read().await
    }

    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        lines: mpsc::UnboundedSender<String>,
    ) -> Result<(), ToolError> {
        self.downloads.write().await.push(url.to_string());

        for line in self.lines.read().await.iter() {
            let _ = lines.send(line.clone());
        }

        let duration_ms = *self.download_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        if let Some(err) = self.download_error.write().await.take() {
            return Err(err);
        }

        if let Some(content) = self.content.read().await.as_ref() {
            let path: PathBuf = dest_dir.join(MOCK_DOWNLOAD_NAME);
            tokio::fs::write(&path, content).await?;
        }
        Ok(())
    }
}
