pub mod config;
pub mod episodes;
pub mod feed;
pub mod launcher;
pub mod metrics;
pub mod pipeline;
pub mod session;
pub mod testing;
pub mod tools;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use episodes::{Episode, EpisodeError, EpisodeLibrary};
pub use launcher::{JobLauncher, SubmitOptions, ValidationError};
pub use pipeline::{ConversionJob, ConversionPipeline, PipelineError, PipelineSettings, PublishError};
pub use session::{ProgressEvent, ProgressSink, SessionChannel, SessionError, SessionId, SessionRegistry};
pub use tools::{AudioTranscoder, FfmpegTranscoder, MediaFetcher, ToolError, YtDlpFetcher};
