//! Progress events and their wire encoding.

use std::fmt;

/// Marker that starts every failure message on the wire.
pub const ERROR_PREFIX: &str = "Error:";

/// Terminal sentinel sent after the success summary.
pub const DONE_SENTINEL: &str = "DONE";

/// Label put in front of info text that would otherwise read as a control message.
pub const INFO_ESCAPE: &str = "[tool] ";

/// One unit of status flowing from a pipeline to its stream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Human-readable status line.
    Info(String),
    /// The job failed; nothing but stream closure follows.
    Error(String),
    /// The job finished successfully; always the last event.
    Complete,
}

impl ProgressEvent {
    pub fn info(text: impl Into<String>) -> Self {
        Self::Info(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }

    /// Whether no further events will follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Complete)
    }

    /// Encodes the event as a single wire line.
    ///
    /// Embedded line breaks are folded into spaces so that one event is always
    /// one message. Info text that equals `DONE`, starts with `Error:` or
    /// starts with the escape label is sent behind [`INFO_ESCAPE`].
    pub fn to_wire(&self) -> String {
        match self {
            Self::Info(text) => {
                let line = single_line(text);
                if needs_escape(&line) {
                    format!("{}{}", INFO_ESCAPE, line)
                } else {
                    line
                }
            }
            Self::Error(text) => format!("{} {}", ERROR_PREFIX, single_line(text)),
            Self::Complete => DONE_SENTINEL.to_string(),
        }
    }

    /// Decodes a wire line back into an event.
    pub fn from_wire(line: &str) -> Self {
        if line == DONE_SENTINEL {
            Self::Complete
        } else if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
            Self::Error(rest.trim_start().to_string())
        } else if let Some(rest) = line.strip_prefix(INFO_ESCAPE) {
            Self::Info(rest.to_string())
        } else {
            Self::Info(line.to_string())
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

fn needs_escape(line: &str) -> bool {
    line == DONE_SENTINEL || line.starts_with(ERROR_PREFIX) || line.starts_with(INFO_ESCAPE)
}

fn single_line(text: &str) -> String {
    if text.contains(['\r', '\n']) {
        text.split(['\r', '\n'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.to_string()
    }
}
