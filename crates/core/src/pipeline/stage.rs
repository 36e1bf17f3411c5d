//! Pipeline stages and the progress text that goes with them.

use serde::Serialize;
use std::fmt;

/// Stages of one conversion job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Downloading,
    Transcoding,
    Normalizing,
    Publishing,
    Done,
}

impl Stage {
    /// Progress text emitted when the stage is entered.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Fetching => "Fetching video information...",
            Self::Downloading => "Starting download...",
            Self::Transcoding => "Converting to MP3 format with optimal quality...",
            Self::Normalizing => "Applying audio normalization...",
            Self::Publishing => "Saving episode...",
            Self::Done => "Conversion complete!",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Downloading => "downloading",
            Self::Transcoding => "transcoding",
            Self::Normalizing => "normalizing",
            Self::Publishing => "publishing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// yt-dlp line markers and the label shown in their place.
const DOWNLOAD_MARKERS: &[(&str, &str)] = &[
    ("[download]", "Downloading:"),
    ("[ExtractAudio]", "Extracting audio:"),
    ("[Merger]", "Merging:"),
    ("[FixupM4a]", "Fixing container:"),
];

/// Turns a raw downloader line into a progress line.
///
/// Known markers get a friendlier label; everything else passes through.
pub fn classify_download_line(line: &str) -> String {
    let line = line.trim();
    for (marker, label) in DOWNLOAD_MARKERS {
        if let Some(rest) = line.strip_prefix(marker) {
            let rest = rest.trim();
            return if rest.is_empty() {
                label.trim_end_matches(':').to_string()
            } else {
                format!("{} {}", label, rest)
            };
        }
    }
    line.to_string()
}
