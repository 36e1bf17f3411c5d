//! Mock audio transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::tools::{AudioTranscoder, ToolError};

/// A recorded transcoder call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTranscode {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Whether this was a normalization pass.
    pub normalize: bool,
    pub success: bool,
}

/// Mock implementation of the AudioTranscoder trait.
///
/// Copies the input to the output instead of encoding. Normalization prefixes
/// the content so tests can tell the two files apart.
#[derive(Debug)]
pub struct MockTranscoder {
    calls: Arc<RwLock<Vec<RecordedTranscode>>>,
    transcode_error: Arc<RwLock<Option<ToolError>>>,
    normalize_error: Arc<RwLock<Option<ToolError>>>,
    normalize_writes_empty: Arc<RwLock<bool>>,
    duration: Arc<RwLock<Option<f64>>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix written before the input content by `normalize`.
pub const NORMALIZED_PREFIX: &[u8] = b"normalized:";

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            transcode_error: Arc::new(RwLock::new(None)),
            normalize_error: Arc::new(RwLock::new(None)),
            normalize_writes_empty: Arc::new(RwLock::new(false)),
            duration: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedTranscode> {
        self.calls.read().await.clone()
    }

    /// Make the next transcode fail.
    pub async fn set_transcode_error(&self, error: ToolError) {
        *self.transcode_error.write().await = Some(error);
    }

    /// Make the next normalization fail.
    pub async fn set_normalize_error(&self, error: ToolError) {
        *self.normalize_error.write().await = Some(error);
    }

    /// Make normalization "succeed" with an empty output file.
    pub async fn set_normalize_writes_empty(&self, empty: bool) {
        *self.normalize_writes_empty.write().await = empty;
    }

    /// Set the duration reported by `probe_duration`.
    pub async fn set_duration(&self, duration: Option<f64>) {
        *self.duration.write().await = duration;
    }

    async fn record(&self, input: &Path, output: &Path, normalize: bool, success: bool) {
        self.calls.write().await.push(RecordedTranscode {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            normalize,
            success,
        });
    }
}

#[async_trait]
impl AudioTranscoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        if let Some(err) = self.transcode_error.write().await.take() {
            self.record(input, output, false, false).await;
            return Err(err);
        }

        tokio::fs::copy(input, output).await?;
        self.record(input, output, false, true).await;
        Ok(())
    }

    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        if let Some(err) = self.normalize_error.write().await.take() {
            self.record(input, output, true, false).await;
            return Err(err);
        }

        let content = if *self.normalize_writes_empty.read().await {
            Vec::new()
        } else {
            let mut content = NORMALIZED_PREFIX.to_vec();
            content.extend(tokio::fs::read(input).await?);
            content
        };
        tokio::fs::write(output, content).await?;
        self.record(input, output, true, true).await;
        Ok(())
    }

    async fn probe_duration(&self, _path: &Path) -> Option<f64> {
        *self.duration.read().await
    }

    async fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }
}
