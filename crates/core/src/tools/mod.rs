//! Adapters for the external command-line tools.
//!
//! The pipeline never spawns processes itself; it talks to two traits:
//!
//! - [`MediaFetcher`]: title lookup, size probe and download (yt-dlp)
//! - [`AudioTranscoder`]: MP3 encode, loudness normalization and duration probe (ffmpeg/ffprobe)
//!
//! Both map a non-zero exit status to [`ToolError::Failed`].
//!
//! # Example
//!
//! ```ignore
//! use tubecast_core::tools::{FfmpegTranscoder, YtDlpFetcher, MediaFetcher};
//!
//! let fetcher = YtDlpFetcher::with_defaults();
//! let title = fetcher.resolve_title("https://youtu.be/dQw4w9WgXcQ").await?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! tokio::spawn(async move {
//!     while let Some(line) = rx.recv().await {
//!         println!("{}", line);
//!     }
//! });
//! fetcher.download("https://youtu.be/dQw4w9WgXcQ", job_dir, tx).await?;
//! ```

mod error;
mod ffmpeg;
mod lines;
mod traits;
mod ytdlp;

pub use error::{truncate_output, ToolError};
pub use ffmpeg::{FfmpegTranscoder, LoudnessTarget};
pub use lines::forward_lines;
pub use traits::{AudioTranscoder, MediaFetcher};
pub use ytdlp::YtDlpFetcher;
