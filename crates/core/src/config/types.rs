use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Where published episodes and per-job scratch directories live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Durable output directory for published MP3 files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Root under which each job gets its own ephemeral directory
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("mp3s")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// External tool locations and limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp binary
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,
    /// Path to the ffmpeg binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Path to the ffprobe binary
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    /// Upper bound for a single download, in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    /// Upper bound for a single ffmpeg run, in seconds
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            download_timeout_secs: default_download_timeout(),
            transcode_timeout_secs: default_transcode_timeout(),
        }
    }
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_download_timeout() -> u64 {
    3600
}

fn default_transcode_timeout() -> u64 {
    3600
}

/// Conversion pipeline limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Jobs whose probed size exceeds this many bytes are rejected
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
    /// Sanitized titles are cut to this many characters
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_download_bytes: default_max_download_bytes(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_max_download_bytes() -> u64 {
    500 * 1024 * 1024
}

fn default_title_max_chars() -> usize {
    100
}

/// Channel-level metadata of the RSS feed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_title")]
    pub title: String,
    #[serde(default = "default_feed_description")]
    pub description: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
        }
    }
}

fn default_feed_title() -> String {
    "YouTube to Podcast Converter".to_string()
}

fn default_feed_description() -> String {
    "Converted YouTube videos".to_string()
}

/// Sanitized config for API responses (local paths reduced to what clients need)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub feed: FeedConfig,
    pub tools: SanitizedToolsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedToolsConfig {
    pub ytdlp: String,
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let binary_name = |path: &PathBuf| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        };

        Self {
            server: config.server.clone(),
            pipeline: config.pipeline.clone(),
            feed: config.feed.clone(),
            tools: SanitizedToolsConfig {
                ytdlp: binary_name(&config.tools.ytdlp_path),
                ffmpeg: binary_name(&config.tools.ffmpeg_path),
                ffprobe: binary_name(&config.tools.ffprobe_path),
            },
        }
    }
}
