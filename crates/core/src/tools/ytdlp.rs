//! yt-dlp based media fetcher.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::error::ToolError;
use super::lines::forward_lines;
use super::traits::MediaFetcher;
use crate::config::ToolsConfig;

const PROGRAM: &str = "yt-dlp";

/// Metadata lookups are quick; anything slower than this is stuck.
const METADATA_TIMEOUT_SECS: u64 = 120;

/// Media fetcher that shells out to yt-dlp.
pub struct YtDlpFetcher {
    config: ToolsConfig,
}

impl YtDlpFetcher {
    /// Creates a new fetcher with the given tool configuration.
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ToolsConfig::default())
    }

    /// Builds yt-dlp arguments for an audio-only download into `dest_dir`.
    fn build_download_args(url: &str, dest_dir: &Path) -> Vec<String> {
        vec![
            "-f".to_string(),
            "bestaudio".to_string(),
            "--restrict-filenames".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--output".to_string(),
            dest_dir.join("%(id)s.%(ext)s").to_string_lossy().to_string(),
            "--no-playlist".to_string(),
            url.to_string(),
        ]
    }

    /// Runs `yt-dlp --print <template>` and returns stdout.
    async fn print_field(&self, url: &str, template: &str) -> Result<String, ToolError> {
        let command = Command::new(&self.config.ytdlp_path)
            .args(["--no-playlist", "--print", template, url])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match timeout(Duration::from_secs(METADATA_TIMEOUT_SECS), command).await {
            Ok(result) => {
                result.map_err(|e| ToolError::spawn(PROGRAM, &self.config.ytdlp_path, e))?
            }
            Err(_) => {
                return Err(ToolError::Timeout {
                    program: PROGRAM.to_string(),
                    timeout_secs: METADATA_TIMEOUT_SECS,
                })
            }
        };

        if !output.status.success() {
            return Err(ToolError::failed(
                PROGRAM,
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Picks the title out of `--print %(title)s` output.
    fn parse_title(output: &str) -> Result<String, ToolError> {
        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ToolError::UnexpectedOutput {
                program: PROGRAM.to_string(),
                reason: "empty title".to_string(),
            })
    }

    /// Parses `%(filesize,filesize_approx)s`. yt-dlp prints `NA` when unknown.
    fn parse_size(output: &str) -> Option<u64> {
        let first = output.lines().map(str::trim).find(|l| !l.is_empty())?;
        first.parse::<u64>().ok().or_else(|| {
            first
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
        })
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        PROGRAM
    }

    async fn resolve_title(&self, url: &str) -> Result<String, ToolError> {
        let output = self.print_field(url, "%(title)s").await?;
        Self::parse_title(&output)
    }

    async fn probe_size(&self, url: &str) -> Option<u64> {
        match self.print_field(url, "%(filesize,filesize_approx)s").await {
            Ok(output) => Self::parse_size(&output),
            Err(e) => {
                debug!("Size probe unavailable for {}: {}", url, e);
                None
            }
        }
    }

    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        lines: mpsc::UnboundedSender<String>,
    ) -> Result<(), ToolError> {
        let args = Self::build_download_args(url, dest_dir);
        debug!("Running {} {:?}", PROGRAM, args);

        let mut child = Command::new(&self.config.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::spawn(PROGRAM, &self.config.ytdlp_path, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("yt-dlp stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("yt-dlp stderr was not captured"))?;

        let timeout_secs = self.config.download_timeout_secs;
        let result = timeout(Duration::from_secs(timeout_secs), async {
            let (out, err, status) = tokio::join!(
                forward_lines(stdout, &lines),
                forward_lines(stderr, &lines),
                child.wait()
            );
            out?;
            err?;
            status
        })
        .await;

        let status = match result {
            Ok(status) => status?,
            Err(_) => {
                warn!("{} timed out after {}s, killing", PROGRAM, timeout_secs);
                let _ = child.kill().await;
                return Err(ToolError::Timeout {
                    program: PROGRAM.to_string(),
                    timeout_secs,
                });
            }
        };

        if !status.success() {
            // The output already went to the caller line by line.
            return Err(ToolError::failed(PROGRAM, status.code(), ""));
        }

        Ok(())
    }
}
