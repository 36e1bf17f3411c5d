//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock tools injected, enabling E2E testing without yt-dlp or ffmpeg.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tubecast_core::{
    config::{PipelineConfig, ServerConfig, StorageConfig},
    testing::{MockFetcher, MockTranscoder},
    Config,
};
use tubecast_server::state::AppState;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Downloads and metadata (MockFetcher)
/// - Encoding, normalization and duration probes (MockTranscoder)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_convert() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/convert", json!({
///         "url": "https://youtu.be/abc"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for registry assertions
    pub state: Arc<AppState>,
    /// Mock fetcher - configure titles, sizes and failures
    pub fetcher: Arc<MockFetcher>,
    /// Mock transcoder - configure failures and durations
    pub transcoder: Arc<MockTranscoder>,
    /// Temporary directory holding output and scratch space
    pub temp_dir: TempDir,
    /// Episode output directory
    pub output_dir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response, for non-JSON endpoints
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    ///
    /// Title lookups and downloads take a short while so progress streams
    /// can attach before the job finishes.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_dir = temp_dir.path().join("mp3s");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let fetcher = Arc::new(MockFetcher::new());
        let transcoder = Arc::new(MockTranscoder::new());
        fetcher
            .set_lookup_duration(Duration::from_millis(50))
            .await;
        fetcher
            .set_download_duration(Duration::from_millis(100))
            .await;

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                output_dir: output_dir.clone(),
                temp_dir: temp_dir.path().join("tmp"),
            },
            pipeline: PipelineConfig::default(),
            ..Default::default()
        };

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&fetcher) as Arc<dyn tubecast_core::MediaFetcher>,
            Arc::clone(&transcoder) as Arc<dyn tubecast_core::AudioTranscoder>,
        ));

        let router = tubecast_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            fetcher,
            transcoder,
            temp_dir,
            output_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let raw = self.send(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.body),
        }
    }

    /// Send a GET request and keep the body as text.
    ///
    /// For progress streams this waits until the stream ends.
    pub async fn get_raw(&self, path: &str, host: Option<&str>) -> RawResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Submit a conversion and return its session id.
    pub async fn submit(&self, url: &str, normalize: bool) -> String {
        let response = self
            .post(
                "/api/v1/convert",
                serde_json::json!({ "url": url, "normalize": normalize }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "body: {:?}", response.body);
        response.body["sessionId"]
            .as_str()
            .expect("sessionId missing")
            .to_string()
    }

    /// Read a whole progress stream and return its `data:` messages.
    pub async fn progress_messages(&self, session_id: &str) -> Vec<String> {
        let response = self
            .get_raw(&format!("/api/v1/progress/{}", session_id), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        sse_messages(&response.body)
    }

    /// Open a progress stream, read its first frame, then disconnect.
    ///
    /// Returns the `data:` messages carried by that frame.
    pub async fn read_one_progress_frame(&self, session_id: &str) -> Vec<String> {
        let request = Request::builder()
            .method("GET")
            .uri(format!("/api/v1/progress/{}", session_id))
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body();
        let frame = body
            .frame()
            .await
            .expect("stream ended before the first frame")
            .expect("Failed to read frame");
        let data = frame.into_data().expect("first frame carries no data");
        drop(body);

        sse_messages(&String::from_utf8_lossy(&data))
    }

    /// Wait until the session is gone from the registry.
    pub async fn wait_for_session_end(&self, session_id: &str) {
        for _ in 0..200 {
            if !self.state.registry().contains(session_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {} never ended", session_id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let raw = self.send(request_builder.body(body).unwrap()).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.body),
        }
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
        }
    }
}

fn parse_json(body: &str) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or(Value::Null)
    }
}

/// Extracts the `data:` payloads from an SSE body, ignoring comments.
pub fn sse_messages(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data).to_string())
        .collect()
}

/// Assert a response has the expected status code.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {}, got {}. Body: {:?}",
            $status, $response.status, $response.body
        );
    };
}
