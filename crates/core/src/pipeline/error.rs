//! Error types for the conversion pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::tools::ToolError;

/// Errors that end a conversion job.
///
/// The `Display` text is what the user sees as the job's error event.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source title could not be resolved.
    #[error("Failed to get video title: {0}")]
    TitleLookup(#[source] ToolError),

    /// The probed size is above the configured ceiling.
    #[error("File too large (max {})", format_size_limit(*limit_bytes))]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    /// The per-job working directory could not be created.
    #[error("Failed to create temp directory: {0}")]
    WorkDir(#[source] std::io::Error),

    /// The downloader exited unsuccessfully.
    #[error("Download failed: {0}")]
    Download(#[source] ToolError),

    /// The downloader succeeded but left nothing behind.
    #[error("No audio file found after download")]
    NoDownloadedFile,

    /// The MP3 encode failed.
    #[error("MP3 conversion failed: {0}")]
    Transcode(#[source] ToolError),

    /// Copying the result into the output directory failed.
    #[error("Failed to save file: {0}")]
    Publish(#[from] PublishError),
}

impl PipelineError {
    /// Coarse failure class, used for metrics labels and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::TitleLookup(_) | Self::TooLarge { .. } | Self::WorkDir(_) => "preflight",
            Self::Download(_) | Self::NoDownloadedFile | Self::Transcode(_) => "subprocess",
            Self::Publish(_) => "publish",
        }
    }

    /// Captured tool output attached to the failure, if any.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::TitleLookup(e) | Self::Download(e) | Self::Transcode(e) => e.output(),
            _ => None,
        }
    }

    /// Full message for the job's error event, including tool output.
    pub fn user_message(&self) -> String {
        match self.tool_output() {
            Some(output) => format!("{} ({})", self, output),
            None => self.to_string(),
        }
    }
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Formats a size ceiling in whole MB, falling back to KB or bytes for small ones.
fn format_size_limit(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Errors that can occur while publishing the finished file.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination file could not be created.
    #[error("Failed to create destination file {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every candidate name was already taken.
    #[error("No free file name for {stem}")]
    NameExhausted { stem: String },

    /// Copying the file content failed.
    #[error("Failed to copy file from {source} to {destination}: {error}")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The copy finished but the destination is empty.
    #[error("Copied file {path} has zero bytes")]
    EmptyFile { path: PathBuf },
}

impl PublishError {
    /// Creates a copy failed error.
    pub fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed {
            source,
            destination,
            error,
        }
    }
}
