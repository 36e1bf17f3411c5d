//! FFmpeg-based audio transcoder.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::ToolError;
use super::traits::AudioTranscoder;
use crate::config::ToolsConfig;

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// Fixed MP3 output parameters: LAME VBR quality 2 (~190 kbps), stereo, 44.1 kHz.
const MP3_CODEC: &str = "libmp3lame";
const MP3_VBR_QUALITY: u8 = 2;
const MP3_CHANNELS: u8 = 2;
const MP3_SAMPLE_RATE_HZ: u32 = 44_100;

/// EBU R128 loudness target used by the normalization pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessTarget {
    /// Integrated loudness in LUFS.
    pub integrated: f64,
    /// Loudness range in LU.
    pub range: f64,
    /// Maximum true peak in dBTP.
    pub true_peak: f64,
}

impl LoudnessTarget {
    /// Podcast-friendly defaults.
    pub const PODCAST: Self = Self {
        integrated: -16.0,
        range: 11.0,
        true_peak: -1.5,
    };

    /// The ffmpeg `loudnorm` filter expression for this target.
    pub fn filter(&self) -> String {
        format!(
            "loudnorm=I={}:LRA={}:TP={}",
            self.integrated, self.range, self.true_peak
        )
    }
}

/// Audio transcoder that shells out to ffmpeg and ffprobe.
pub struct FfmpegTranscoder {
    config: ToolsConfig,
    loudness: LoudnessTarget,
}

impl FfmpegTranscoder {
    /// Creates a new transcoder with the given tool configuration.
    pub fn new(config: ToolsConfig) -> Self {
        Self {
            config,
            loudness: LoudnessTarget::PODCAST,
        }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ToolsConfig::default())
    }

    /// Builds ffmpeg arguments for an MP3 encode, optionally through an audio filter.
    fn build_mp3_args(input: &Path, output: &Path, audio_filter: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-c:a".to_string(),
            MP3_CODEC.to_string(),
            "-q:a".to_string(),
            MP3_VBR_QUALITY.to_string(),
            "-ac".to_string(),
            MP3_CHANNELS.to_string(),
            "-ar".to_string(),
            MP3_SAMPLE_RATE_HZ.to_string(),
        ];

        if let Some(filter) = audio_filter {
            args.extend(["-af".to_string(), filter.to_string()]);
        }

        args.extend(["-loglevel".to_string(), "error".to_string()]);
        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Runs ffmpeg to completion and checks that it produced a non-empty file.
    async fn run_ffmpeg(&self, args: &[String], output: &Path) -> Result<(), ToolError> {
        debug!("Running {} {:?}", FFMPEG, args);

        let command = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let timeout_secs = self.config.transcode_timeout_secs;
        let result = match timeout(Duration::from_secs(timeout_secs), command).await {
            Ok(result) => {
                result.map_err(|e| ToolError::spawn(FFMPEG, &self.config.ffmpeg_path, e))?
            }
            Err(_) => {
                return Err(ToolError::Timeout {
                    program: FFMPEG.to_string(),
                    timeout_secs,
                })
            }
        };

        if !result.status.success() {
            return Err(ToolError::failed(
                FFMPEG,
                result.status.code(),
                &String::from_utf8_lossy(&result.stderr),
            ));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(ToolError::EmptyOutput {
                program: FFMPEG.to_string(),
                path: output.to_path_buf(),
            }),
        }
    }

    /// Parses ffprobe's bare `format=duration` output.
    fn parse_duration(output: &str) -> Option<f64> {
        output
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
    }

    async fn check_binary(program: &str, path: &Path) -> Result<(), ToolError> {
        Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map(|_| ())
            .map_err(|e| ToolError::spawn(program, path, e))
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        FFMPEG
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let args = Self::build_mp3_args(input, output, None);
        self.run_ffmpeg(&args, output).await
    }

    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let filter = self.loudness.filter();
        let args = Self::build_mp3_args(input, output, Some(&filter));
        self.run_ffmpeg(&args, output).await
    }

    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            return None;
        }

        Self::parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn validate(&self) -> Result<(), ToolError> {
        Self::check_binary(FFMPEG, &self.config.ffmpeg_path).await?;
        Self::check_binary(FFPROBE, &self.config.ffprobe_path).await
    }
}
