//! Conversion pipeline: URL in, published MP3 out.
//!
//! A job moves through [`Stage`]s in order:
//!
//! ```text
//! Fetching -> Downloading -> Transcoding -> [Normalizing] -> Publishing -> Done
//!     \            \              \                             \
//!      +------------+--------------+-------- Failed ------------+
//! ```
//!
//! Normalization failures are not fatal; the job falls back to the plain
//! encode. Every other failure ends the job with one error event.

mod error;
mod publish;
mod runner;
mod stage;
mod types;

pub use error::{PipelineError, PublishError};
pub use publish::{
    episode_stem, episode_title, sanitize_filename, PublishedEpisode, Publisher,
    NORMALIZED_MARKER, RESERVED_CHARS,
};
pub use runner::ConversionPipeline;
pub use stage::{classify_download_line, Stage};
pub use types::{ConversionJob, PipelineSettings};
