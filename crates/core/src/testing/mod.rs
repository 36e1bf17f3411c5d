//! Testing utilities and mock implementations of the tool traits.
//!
//! The mocks stand in for yt-dlp and ffmpeg so the pipeline, launcher and
//! HTTP layer can be exercised without any external binaries.
//!
//! # Example
//!
//! ```rust,ignore
//! use tubecast_core::testing::{MockFetcher, MockTranscoder};
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! let transcoder = Arc::new(MockTranscoder::new());
//! transcoder.set_normalize_error(ToolError::failed("ffmpeg", Some(1), "")).await;
//!
//! let pipeline = ConversionPipeline::new(settings, fetcher.clone(), transcoder.clone());
//! ```

mod mock_fetcher;
mod mock_transcoder;

pub use mock_fetcher::{MockFetcher, MOCK_DOWNLOAD_NAME};
pub use mock_transcoder::{MockTranscoder, RecordedTranscode, NORMALIZED_PREFIX};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::sync::Arc;

    use super::{MockFetcher, MockTranscoder};
    use crate::pipeline::{ConversionPipeline, PipelineSettings};

    /// Pipeline settings rooted in `root`, with the default size ceiling.
    pub fn settings(root: &Path) -> PipelineSettings {
        PipelineSettings {
            output_dir: root.join("mp3s"),
            temp_dir: root.join("tmp"),
            max_download_bytes: 500 * 1024 * 1024,
            title_max_chars: 100,
        }
    }

    /// A pipeline wired to the given mocks.
    pub fn pipeline(
        root: &Path,
        fetcher: Arc<MockFetcher>,
        transcoder: Arc<MockTranscoder>,
    ) -> ConversionPipeline {
        ConversionPipeline::new(settings(root), fetcher, transcoder)
    }
}
