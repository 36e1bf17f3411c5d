//! The conversion state machine.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::metrics::{JOBS_FINISHED, JOB_DURATION, NORMALIZE_FALLBACKS};
use crate::session::ProgressSink;
use crate::tools::{AudioTranscoder, MediaFetcher};

use super::error::PipelineError;
use super::publish::{episode_stem, episode_title, PublishedEpisode, Publisher};
use super::stage::{classify_download_line, Stage};
use super::types::{ConversionJob, PipelineSettings};

/// Prefix of per-job working directories.
const WORKDIR_PREFIX: &str = "tubecast-";

/// Partial-download suffixes left behind by the downloader.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

const CONVERTED_FILE: &str = "converted.mp3";
const NORMALIZED_FILE: &str = "normalized.mp3";

/// Runs one job from URL to published episode.
///
/// Each job gets its own working directory, removed when the job ends. All
/// progress goes through the job's [`ProgressSink`].
pub struct ConversionPipeline {
    settings: PipelineSettings,
    fetcher: Arc<dyn MediaFetcher>,
    transcoder: Arc<dyn AudioTranscoder>,
    publisher: Publisher,
}

impl ConversionPipeline {
    pub fn new(
        settings: PipelineSettings,
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Self {
        let publisher = Publisher::new(settings.output_dir.clone());
        Self {
            settings,
            fetcher,
            transcoder,
            publisher,
        }
    }

    /// Runs the job to completion and reports the outcome on `sink`.
    ///
    /// Exactly one terminal event is sent. The working directory is removed
    /// and the sink dropped (closing the session) before this returns.
    pub async fn execute(
        &self,
        job: ConversionJob,
        sink: ProgressSink,
    ) -> Result<PublishedEpisode, PipelineError> {
        let started = Instant::now();
        info!(session_id = %sink.id(), url = %job.url, normalize = job.normalize, "Job started");

        let result = match self.create_workdir() {
            Ok(workdir) => {
                let result = self.run(&job, workdir.path(), &sink).await;
                remove_workdir(workdir).await;
                result
            }
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(episode) => {
                sink.info(format!("Successfully saved as: {}", episode.file_name));
                sink.info(Stage::Done.message());
                sink.complete();
                info!(
                    session_id = %sink.id(),
                    file = %episode.file_name,
                    size_bytes = episode.size_bytes,
                    normalized = episode.normalized,
                    "Job completed"
                );
                "success"
            }
            Err(e) => {
                sink.error(e.user_message());
                warn!(
                    session_id = %sink.id(),
                    category = e.category(),
                    "Job failed: {}",
                    e
                );
                e.category()
            }
        };

        JOBS_FINISHED.with_label_values(&[outcome]).inc();
        JOB_DURATION
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        drop(sink);
        result
    }

    /// Walks the stages. Any error ends the job at the stage it occurred in.
    async fn run(
        &self,
        job: &ConversionJob,
        workdir: &Path,
        sink: &ProgressSink,
    ) -> Result<PublishedEpisode, PipelineError> {
        enter(Stage::Fetching, sink);
        let title = self
            .fetcher
            .resolve_title(&job.url)
            .await
            .map_err(PipelineError::TitleLookup)?;
        debug!(session_id = %sink.id(), title = %title, "Resolved title");
        self.check_size(&job.url).await?;

        enter(Stage::Downloading, sink);
        self.download(&job.url, workdir, sink).await?;
        let downloaded = find_downloaded_file(workdir).await?;

        enter(Stage::Transcoding, sink);
        let converted = workdir.join(CONVERTED_FILE);
        self.transcoder
            .transcode(&downloaded, &converted)
            .await
            .map_err(PipelineError::Transcode)?;

        let (final_file, normalized) = if job.normalize {
            self.normalize(&converted, workdir, sink).await
        } else {
            (converted, false)
        };

        enter(Stage::Publishing, sink);
        let title = episode_title(&title, self.settings.title_max_chars);
        let stem = episode_stem(&title, normalized, Local::now());
        let episode = self.publisher.publish(&final_file, &stem, normalized).await?;
        Ok(episode)
    }

    /// Rejects sources above the size ceiling. Unknown sizes pass.
    async fn check_size(&self, url: &str) -> Result<(), PipelineError> {
        let limit_bytes = self.settings.max_download_bytes;
        match self.fetcher.probe_size(url).await {
            Some(size_bytes) if size_bytes > limit_bytes => Err(PipelineError::TooLarge {
                size_bytes,
                limit_bytes,
            }),
            Some(size_bytes) => {
                debug!("Probed size {} bytes (limit {})", size_bytes, limit_bytes);
                Ok(())
            }
            None => {
                debug!("Size unknown for {}, continuing", url);
                Ok(())
            }
        }
    }

    /// Downloads into `workdir`, forwarding every tool line as progress.
    async fn download(
        &self,
        url: &str,
        workdir: &Path,
        sink: &ProgressSink,
    ) -> Result<(), PipelineError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let forward = async {
            while let Some(line) = rx.recv().await {
                sink.info(classify_download_line(&line));
            }
        };

        let (result, ()) = tokio::join!(self.fetcher.download(url, workdir, tx), forward);
        result.map_err(PipelineError::Download)
    }

    /// Applies loudness normalization, falling back to `converted` on failure.
    ///
    /// Returns the file to publish and whether normalization was applied.
    async fn normalize(
        &self,
        converted: &Path,
        workdir: &Path,
        sink: &ProgressSink,
    ) -> (PathBuf, bool) {
        enter(Stage::Normalizing, sink);
        let normalized = workdir.join(NORMALIZED_FILE);

        let result = match self.transcoder.normalize(converted, &normalized).await {
            Ok(()) => non_empty(&normalized).await,
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => {
                sink.info("Normalization complete!");
                (normalized, true)
            }
            Err(reason) => {
                NORMALIZE_FALLBACKS.inc();
                warn!(session_id = %sink.id(), "Normalization failed, using original audio: {}", reason);
                sink.info(format!(
                    "Warning: normalization failed ({}), using original audio",
                    reason
                ));
                (converted.to_path_buf(), false)
            }
        }
    }

    fn create_workdir(&self) -> Result<TempDir, PipelineError> {
        std::fs::create_dir_all(&self.settings.temp_dir).map_err(PipelineError::WorkDir)?;
        tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(&self.settings.temp_dir)
            .map_err(PipelineError::WorkDir)
    }
}

fn enter(stage: Stage, sink: &ProgressSink) {
    debug!(session_id = %sink.id(), stage = %stage, "Entering stage");
    sink.info(stage.message());
}

async fn non_empty(path: &Path) -> Result<(), String> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err("output file is empty".to_string()),
        Err(e) => Err(format!("output file missing: {}", e)),
    }
}

/// First complete regular file in `dir`, by name.
async fn find_downloaded_file(dir: &Path) -> Result<PathBuf, PipelineError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|_| PipelineError::NoDownloadedFile)?;

    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && !PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or(PipelineError::NoDownloadedFile)
}

async fn remove_workdir(workdir: TempDir) {
    let path = workdir.path().to_path_buf();
    match tokio::task::spawn_blocking(move || workdir.close()).await {
        Ok(Ok(())) => debug!("Removed job directory {}", path.display()),
        Ok(Err(e)) => warn!("Failed to remove job directory {}: {}", path.display(), e),
        Err(e) => warn!("Job directory cleanup task failed for {}: {}", path.display(), e),
    }
}
