//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the router with a mock
//! metadata fetcher and shell scripts standing in for yt-dlp and ffmpeg,
//! so downloads can be exercised end to end without the real tools.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pipestream_core::{
    testing::{scripts::FakeTool, MockMetadataFetcher},
    ActionLog, ActionLogConfig, Config, MetadataFetcher, StreamingConfig, ToolsConfig, WebConfig,
};
use pipestream_server::{api::create_router, state::AppState};

/// Downloader stand-in: prints a marker depending on the requested stream.
const FAKE_DOWNLOADER: &str = r#"case "$*" in
  *bestvideo*) printf 'VIDEO' ;;
  *bestaudio*) printf 'AUDIO' ;;
  *) exit 2 ;;
esac"#;

/// Muxer stand-in: copies its two inherited inputs in order.
const FAKE_MUXER: &str = r#"for arg in "$@"; do
  case "$arg" in
    pipe:3) cat <&3 ;;
    pipe:4) cat <&4 ;;
  esac
done"#;

/// Fixture knobs.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub muxer_script: Option<String>,
    pub missing_muxer: bool,
    pub expiry_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            muxer_script: None,
            missing_muxer: false,
            expiry_secs: 1,
        }
    }
}

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_download() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.post_form("/download", &[("url", "https://example.com/v")]).await;
///     assert_eq!(response.status, 400);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock metadata fetcher - configure titles and failures
    pub metadata: Arc<MockMetadataFetcher>,
    /// Shared action log
    pub action_log: ActionLog,
    /// Holds fake tools, template and static files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl TestFixture {
    /// Create a new test fixture with default fakes.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let bin_dir = temp_dir.path().join("bin");
        let templates_dir = temp_dir.path().join("templates");
        let static_dir = temp_dir.path().join("static");
        for dir in [&bin_dir, &templates_dir, &static_dir] {
            std::fs::create_dir_all(dir).expect("Failed to create fixture dir");
        }
        std::fs::write(
            templates_dir.join("index.html"),
            "<html><body><form action=\"/download\"></form></body></html>",
        )
        .expect("Failed to write template");
        std::fs::write(static_dir.join("app.js"), "console.log('pipestream');")
            .expect("Failed to write static file");

        let downloader = FakeTool::write(&bin_dir, "yt-dlp", FAKE_DOWNLOADER);
        let muxer = if test_config.missing_muxer {
            bin_dir.join("no-such-ffmpeg")
        } else {
            FakeTool::write(
                &bin_dir,
                "ffmpeg",
                test_config.muxer_script.as_deref().unwrap_or(FAKE_MUXER),
            )
        };

        let config = Config {
            tools: ToolsConfig {
                downloader_path: downloader,
                muxer_path: muxer,
                inherit_stderr: false,
                ..Default::default()
            },
            streaming: StreamingConfig {
                muxer_stop_timeout_secs: 1,
                fetch_exit_timeout_secs: 2,
                sweep_grace_millis: 200,
                ..Default::default()
            },
            action_log: ActionLogConfig {
                expiry_secs: test_config.expiry_secs,
            },
            web: WebConfig {
                templates_dir,
                static_dir,
            },
            ..Default::default()
        };

        let metadata = Arc::new(MockMetadataFetcher::new());
        let action_log = ActionLog::new();
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&metadata) as Arc<dyn MetadataFetcher>,
            action_log.clone(),
        ));

        Self {
            router: create_router(state),
            metadata,
            action_log,
            temp_dir,
        }
    }

    /// Path of a file inside the fixture directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a POST request with an urlencoded form body.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.post_raw(path, "application/x-www-form-urlencoded", &form_body(fields))
            .await
    }

    /// Send a POST request with an arbitrary content type.
    pub async fn post_raw(&self, path: &str, content_type: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Start a download and return the response with its body still streaming.
    pub async fn start_download(&self, fields: &[(&str, &str)]) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri("/download")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(form_body(fields)))
            .unwrap();
        self.call(request).await
    }

    /// Route a request without reading its response body.
    pub async fn call(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a request and collect the whole body.
    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.call(request).await;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Urlencodes form fields.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
