//! Types shared by the pipeline and its callers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;

/// One accepted conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Source URL, already validated.
    pub url: String,
    /// Whether to apply loudness normalization.
    pub normalize: bool,
}

impl ConversionJob {
    pub fn new(url: impl Into<String>, normalize: bool) -> Self {
        Self {
            url: url.into(),
            normalize,
        }
    }
}

/// Settings the pipeline reads on every run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory episodes are published into.
    pub output_dir: PathBuf,
    /// Parent of the per-job working directories.
    pub temp_dir: PathBuf,
    /// Size ceiling checked before downloading.
    pub max_download_bytes: u64,
    /// Maximum title length, in characters, used for file names.
    pub title_max_chars: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            output_dir: config.storage.output_dir.clone(),
            temp_dir: config.storage.temp_dir.clone(),
            max_download_bytes: config.pipeline.max_download_bytes,
            title_max_chars: config.pipeline.title_max_chars,
        }
    }
}
