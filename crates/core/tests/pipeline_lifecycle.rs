//! Pipeline lifecycle integration tests.
//!
//! These tests drive whole jobs through the pipeline with mock tools:
//! fetching -> downloading -> transcoding -> [normalizing] -> publishing -> done

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use tubecast_core::{
    pipeline::{ConversionJob, PipelineError},
    testing::{fixtures, MockFetcher, MockTranscoder, MOCK_DOWNLOAD_NAME, NORMALIZED_PREFIX},
    ConversionPipeline, ProgressEvent, SessionRegistry, ToolError,
};

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Test helper owning the mocks, the registry and the scratch directories.
struct TestHarness {
    fetcher: Arc<MockFetcher>,
    transcoder: Arc<MockTranscoder>,
    registry: Arc<SessionRegistry>,
    pipeline: ConversionPipeline,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let fetcher = Arc::new(MockFetcher::new());
        let transcoder = Arc::new(MockTranscoder::new());
        let pipeline = fixtures::pipeline(temp_dir.path(), fetcher.clone(), transcoder.clone());

        Self {
            fetcher,
            transcoder,
            registry: Arc::new(SessionRegistry::new()),
            pipeline,
            temp_dir,
        }
    }

    fn output_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("mp3s")
    }

    /// Runs one job and returns its result plus every event it emitted.
    async fn run(
        &self,
        normalize: bool,
    ) -> (
        Result<tubecast_core::pipeline::PublishedEpisode, PipelineError>,
        Vec<ProgressEvent>,
    ) {
        let (id, sink) = self.registry.create();
        let channel = self.registry.get(id.as_str()).unwrap();

        let result = self
            .pipeline
            .execute(ConversionJob::new(URL, normalize), sink)
            .await;

        let mut events = Vec::new();
        while let Some(event) = channel.recv().await {
            events.push(event);
        }

        assert!(
            self.registry.get(id.as_str()).is_err(),
            "session must be gone once the job ends"
        );
        (result, events)
    }

    fn published_files(&self) -> Vec<String> {
        list_dir(&self.output_dir())
    }

    fn leftover_workdirs(&self) -> Vec<String> {
        list_dir(&self.temp_dir.path().join("tmp"))
    }
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn texts(events: &[ProgressEvent]) -> Vec<String> {
    events.iter().map(|e| e.to_wire()).collect()
}

fn assert_single_terminal(events: &[ProgressEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "events: {:?}", events);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_successful_job_publishes_and_completes() {
    let harness = TestHarness::new();

    let (result, events) = harness.run(false).await;
    let episode = result.expect("job should succeed");

    assert!(episode.file_name.starts_with("Mock Video_"));
    assert!(episode.file_name.ends_with(".mp3"));
    assert!(!episode.file_name.contains("_NORM_"));
    assert!(!episode.normalized);

    let wire = texts(&events);
    assert_eq!(
        wire,
        vec![
            "Fetching video information...".to_string(),
            "Starting download...".to_string(),
            "[youtube] mock: Downloading webpage".to_string(),
            "Downloading: 50.0% of 1.00MiB at 1.00MiB/s ETA 00:01".to_string(),
            "Downloading: 100% of 1.00MiB in 00:01".to_string(),
            "Converting to MP3 format with optimal quality...".to_string(),
            "Saving episode...".to_string(),
            format!("Successfully saved as: {}", episode.file_name),
            "Conversion complete!".to_string(),
            "DONE".to_string(),
        ]
    );
    assert_single_terminal(&events);

    assert_eq!(harness.published_files(), vec![episode.file_name.clone()]);
    assert_eq!(
        std::fs::read(harness.output_dir().join(&episode.file_name)).unwrap(),
        b"mock audio data"
    );
    assert!(harness.leftover_workdirs().is_empty());
    assert_eq!(harness.fetcher.recorded_downloads().await, vec![URL.to_string()]);
}

#[tokio::test]
async fn test_normalized_job_marks_file() {
    let harness = TestHarness::new();

    let (result, events) = harness.run(true).await;
    let episode = result.unwrap();

    assert!(episode.normalized);
    assert!(episode.file_name.starts_with("Mock Video_NORM_"));
    let wire = texts(&events);
    assert!(wire.contains(&"Applying audio normalization...".to_string()));
    assert!(wire.contains(&"Normalization complete!".to_string()));
    assert_eq!(wire.last().unwrap(), "DONE");

    let content = std::fs::read(harness.output_dir().join(&episode.file_name)).unwrap();
    assert!(content.starts_with(NORMALIZED_PREFIX));

    // Encode from the download, then normalize the encode.
    let calls = harness.transcoder.recorded_calls().await;
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].normalize);
    assert_eq!(calls[0].input.file_name().unwrap(), MOCK_DOWNLOAD_NAME);
    assert_eq!(calls[0].output.file_name().unwrap(), "converted.mp3");
    assert!(calls[1].normalize && calls[1].success);
    assert_eq!(calls[1].input, calls[0].output);
    assert_eq!(calls[1].output.file_name().unwrap(), "normalized.mp3");
}

#[tokio::test]
async fn test_tool_lines_never_end_the_stream_early() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_lines(vec!["DONE".to_string(), "Error: fragment 3 retry".to_string()])
        .await;

    let (result, events) = harness.run(false).await;
    result.unwrap();

    assert!(events.contains(&ProgressEvent::info("DONE")));
    assert!(events.contains(&ProgressEvent::info("Error: fragment 3 retry")));
    let wire = texts(&events);
    assert!(wire.contains(&"[tool] DONE".to_string()));
    assert_eq!(wire.iter().filter(|t| *t == "DONE").count(), 1);
    assert_eq!(wire.iter().filter(|t| t.starts_with("Error:")).count(), 0);
    assert_single_terminal(&events);
}

#[tokio::test]
async fn test_normalization_failure_falls_back() {
    let harness = TestHarness::new();
    harness
        .transcoder
        .set_normalize_error(ToolError::failed("ffmpeg", Some(1), "loudnorm blew up"))
        .await;

    let (result, events) = harness.run(true).await;
    let episode = result.expect("normalization failure must not abort the job");

    assert!(!episode.normalized);
    assert!(!episode.file_name.contains("_NORM_"));
    assert!(events
        .iter()
        .all(|e| !matches!(e, ProgressEvent::Error(_))));
    assert!(texts(&events)
        .iter()
        .any(|t| t.starts_with("Warning: normalization failed (")
            && t.ends_with("using original audio")));
    assert_eq!(events.last(), Some(&ProgressEvent::Complete));

    let content = std::fs::read(harness.output_dir().join(&episode.file_name)).unwrap();
    assert_eq!(content, b"mock audio data");
}

#[tokio::test]
async fn test_empty_normalized_output_falls_back() {
    let harness = TestHarness::new();
    harness.transcoder.set_normalize_writes_empty(true).await;

    let (result, events) = harness.run(true).await;
    let episode = result.unwrap();

    assert!(!episode.normalized);
    assert_eq!(events.last(), Some(&ProgressEvent::Complete));
}

#[tokio::test]
async fn test_download_failure_ends_with_error() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_download_error(ToolError::failed("yt-dlp", Some(1), ""))
        .await;

    let (result, events) = harness.run(false).await;

    let err = result.unwrap_err();
    assert_eq!(err.category(), "subprocess");
    assert_single_terminal(&events);
    match events.last() {
        Some(ProgressEvent::Error(text)) => assert!(text.starts_with("Download failed")),
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(!events.contains(&ProgressEvent::Complete));
    assert!(harness.published_files().is_empty());
    assert!(harness.leftover_workdirs().is_empty());
}

#[tokio::test]
async fn test_oversized_source_is_rejected_before_download() {
    let harness = TestHarness::new();
    harness.fetcher.set_size(Some(501 * 1024 * 1024)).await;

    let (result, events) = harness.run(false).await;

    assert!(matches!(result, Err(PipelineError::TooLarge { .. })));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::error("File too large (max 500MB)"))
    );
    assert!(harness.fetcher.recorded_downloads().await.is_empty());
}

#[tokio::test]
async fn test_size_at_ceiling_passes() {
    let harness = TestHarness::new();
    harness.fetcher.set_size(Some(500 * 1024 * 1024)).await;

    let (result, _) = harness.run(false).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_unknown_size_passes() {
    let harness = TestHarness::new();
    harness.fetcher.set_size(None).await;

    let (result, events) = harness.run(false).await;
    assert!(result.is_ok());
    assert_eq!(events.last(), Some(&ProgressEvent::Complete));
}

#[tokio::test]
async fn test_title_failure_is_preflight() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_title_error(ToolError::failed("yt-dlp", Some(1), "ERROR: Video unavailable"))
        .await;

    let (result, events) = harness.run(false).await;

    assert_eq!(result.unwrap_err().category(), "preflight");
    assert_eq!(
        texts(&events),
        vec![
            "Fetching video information...".to_string(),
            "Error: Failed to get video title: yt-dlp exited with code 1 (ERROR: Video unavailable)"
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn test_missing_download_output() {
    let harness = TestHarness::new();
    harness.fetcher.set_content(None).await;

    let (result, events) = harness.run(false).await;

    assert!(matches!(result, Err(PipelineError::NoDownloadedFile)));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::error("No audio file found after download"))
    );
}

#[tokio::test]
async fn test_transcode_failure() {
    let harness = TestHarness::new();
    harness
        .transcoder
        .set_transcode_error(ToolError::failed("ffmpeg", Some(1), ""))
        .await;

    let (result, events) = harness.run(true).await;

    assert!(matches!(result, Err(PipelineError::Transcode(_))));
    assert_single_terminal(&events);
    assert!(!texts(&events).contains(&"Applying audio normalization...".to_string()));
    let calls = harness.transcoder.recorded_calls().await;
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].success);
    assert!(harness.published_files().is_empty());
    assert!(harness.leftover_workdirs().is_empty());
}

#[tokio::test]
async fn test_title_is_sanitized_into_filename() {
    let harness = TestHarness::new();
    harness.fetcher.set_title("a/b:c").await;

    let (result, _) = harness.run(false).await;
    assert!(result.unwrap().file_name.starts_with("a-b-c_"));
}

#[tokio::test]
async fn test_same_title_twice_gets_distinct_files() {
    let harness = TestHarness::new();

    let (first, _) = harness.run(false).await;
    let (second, _) = harness.run(false).await;

    assert_ne!(first.unwrap().file_name, second.unwrap().file_name);
    assert_eq!(harness.published_files().len(), 2);
}
