//! Error types for the external tool adapters.

use std::path::PathBuf;
use thiserror::Error;

/// Longest stretch of captured tool output kept inside an error.
const MAX_OUTPUT_CHARS: usize = 500;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary could not be found.
    #[error("{program} not found at path: {path}")]
    NotFound { program: String, path: PathBuf },

    /// The tool ran and exited unsuccessfully.
    #[error("{program} exited with code {}", code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    Failed {
        program: String,
        code: Option<i32>,
        output: Option<String>,
    },

    /// The tool did not finish in time and was killed.
    #[error("{program} timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },

    /// The tool succeeded but its output file is missing or empty.
    #[error("{program} produced no output at {path}")]
    EmptyOutput { program: String, path: PathBuf },

    /// The tool printed something we could not interpret.
    #[error("Unexpected output from {program}: {reason}")]
    UnexpectedOutput { program: String, reason: String },

    /// I/O error while talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Creates a failure error from an exit code and captured output.
    pub fn failed(program: impl Into<String>, code: Option<i32>, output: &str) -> Self {
        let output = output.trim();
        Self::Failed {
            program: program.into(),
            code,
            output: if output.is_empty() {
                None
            } else {
                Some(truncate_output(output, MAX_OUTPUT_CHARS))
            },
        }
    }

    /// Maps a spawn error, turning `NotFound` into a friendlier variant.
    pub fn spawn(program: impl Into<String>, path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                program: program.into(),
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }

    /// Captured output of a failed run, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => output.as_deref(),
            _ => None,
        }
    }
}

/// Keeps the last `max_chars` characters of a tool's output.
///
/// The tail is what carries the actual error for ffmpeg and yt-dlp.
pub fn truncate_output(output: &str, max_chars: usize) -> String {
    let count = output.chars().count();
    if count <= max_chars {
        return output.to_string();
    }
    let tail: String = output.chars().skip(count - max_chars).collect();
    format!("[truncated] ...{}", tail)
}
