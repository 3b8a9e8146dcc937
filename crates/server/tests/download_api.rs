//! Download endpoint tests.
//!
//! Requests go through the full router with fake downloader and muxer
//! scripts, so the response body is the real muxer output.

mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use http_body_util::BodyExt;
use common::{TestConfig, TestFixture};
use pipestream_core::{MetadataError, VideoMetadata};

const URL: &str = "https://example.com/watch?v=abc";

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_missing_url_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_form("/download", &[("download_id", "dl-1")])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "URL parameter is missing.");
    assert_eq!(fixture.metadata.fetch_count().await, 0);
}

#[tokio::test]
async fn test_missing_download_id_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_form("/download", &[("url", URL)]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "Download ID parameter is missing.");
    assert!(fixture.action_log.is_empty().await);
}

#[tokio::test]
async fn test_non_http_url_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_form(
            "/download",
            &[("url", "ftp://example.com/file"), ("download_id", "dl-2")],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid URL"));
}

#[tokio::test]
async fn test_non_form_body_is_rejected_as_json() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_raw("/download", "text/plain", "url=https://example.com/v")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.body["detail"].as_str().unwrap().is_empty());
    assert_eq!(fixture.metadata.fetch_count().await, 0);
}

// =============================================================================
// Metadata failures
// =============================================================================

#[tokio::test]
async fn test_metadata_failure_returns_tool_error() {
    let fixture = TestFixture::new().await;
    fixture
        .metadata
        .set_next_error(MetadataError::fetch_failed(Some(1), "ERROR: Unsupported URL"))
        .await;

    let response = fixture
        .post_form("/download", &[("url", URL), ("download_id", "dl-3")])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["detail"],
        "Failed to get video info: ERROR: Unsupported URL"
    );

    let entry = fixture.action_log.get("dl-3").await.unwrap();
    assert_eq!(
        entry.last_action,
        "Failed to get video info: ERROR: Unsupported URL"
    );
}

#[tokio::test]
async fn test_metadata_parse_failure_is_internal_error() {
    let fixture = TestFixture::new().await;
    fixture
        .metadata
        .set_next_error(MetadataError::parse_failed("invalid JSON"))
        .await;

    let response = fixture
        .post_form("/download", &[("url", URL), ("download_id", "dl-4")])
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Error parsing video information"));
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_download_streams_muxed_output() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_form(
            "/download",
            &[
                ("url", URL),
                ("quality", "720"),
                ("container", "flac"),
                ("download_id", "dl-5"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    // Unsupported containers fall back to Matroska
    assert_eq!(response.header("content-type"), Some("video/x-matroska"));
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"Test Video.mkv\"; filename*=UTF-8''Test%20Video.mkv")
    );
    assert_eq!(response.bytes, b"VIDEOAUDIO");
    assert_eq!(fixture.metadata.fetched_urls().await, vec![URL]);
}

#[tokio::test]
async fn test_download_mp4_container() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_form(
            "/download",
            &[("url", URL), ("container", "mp4"), ("download_id", "dl-6")],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("video/mp4"));
    assert!(response
        .header("content-disposition")
        .unwrap()
        .contains("Test Video.mp4"));
    assert_eq!(response.bytes, b"VIDEOAUDIO");
}

#[tokio::test]
async fn test_download_filename_is_sanitized() {
    let fixture = TestFixture::new().await;
    fixture
        .metadata
        .set_metadata(VideoMetadata::with_title("AC/DC: \"Live\""))
        .await;

    let response = fixture
        .post_form("/download", &[("url", URL), ("download_id", "dl-7")])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .header("content-disposition")
        .unwrap()
        .contains("filename=\"AC_DC_ _Live_.mkv\""));
}

#[tokio::test]
async fn test_download_without_title_uses_fallback_name() {
    let fixture = TestFixture::new().await;
    fixture
        .metadata
        .set_metadata(VideoMetadata::with_title("   "))
        .await;

    let response = fixture
        .post_form("/download", &[("url", URL), ("download_id", "dl-8")])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .header("content-disposition")
        .unwrap()
        .starts_with("attachment; filename=\"video.mkv\""));
}

#[tokio::test]
async fn test_missing_muxer_fails_before_streaming() {
    let fixture = TestFixture::with_config(TestConfig {
        missing_muxer: true,
        ..Default::default()
    })
    .await;

    let response = fixture
        .post_form("/download", &[("url", URL), ("download_id", "dl-9")])
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Failed to start video stream"));

    let entry = fixture.action_log.get("dl-9").await.unwrap();
    assert!(entry.last_action.starts_with("Failed to start video stream"));
}

#[tokio::test]
async fn test_muxer_error_is_logged_after_stream() {
    let fixture = TestFixture::with_config(TestConfig {
        muxer_script: Some("cat <&3; cat <&4; exit 1".to_string()),
        ..Default::default()
    })
    .await;

    let response = fixture
        .post_form("/download", &[("url", URL), ("download_id", "dl-10")])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, b"VIDEOAUDIO");

    let entry = fixture.action_log.get("dl-10").await.unwrap();
    assert!(entry
        .last_action
        .starts_with("Streaming finished with errors"));
}

// =============================================================================
// Client disconnect
// =============================================================================

#[tokio::test]
async fn test_client_disconnect_stops_muxer_and_expires_log() {
    // Records its pid, then streams forever until signalled
    let fixture = TestFixture::with_config(TestConfig {
        muxer_script: Some(r#"echo $$ > "$(dirname "$0")/muxer.pid"; exec yes"#.to_string()),
        ..Default::default()
    })
    .await;

    let response = fixture
        .start_download(&[("url", URL), ("download_id", "leaver")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let frame = body
        .frame()
        .await
        .expect("body ended before the first chunk")
        .expect("body failed");
    assert!(frame.data_ref().is_some_and(|data| !data.is_empty()));
    drop(body);

    let started = Instant::now();
    loop {
        let entry = fixture.action_log.get("leaver").await;
        if entry.is_some_and(|e| e.last_action == "Client disconnected") {
            break;
        }
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "disconnect was never logged"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let pid = std::fs::read_to_string(fixture.path("bin/muxer.pid")).unwrap();
    let alive = std::process::Command::new("/bin/sh")
        .args(["-c", &format!("kill -0 {}", pid.trim())])
        .status()
        .unwrap();
    assert!(!alive.success(), "muxer {} survived the disconnect", pid.trim());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let log = fixture.get("/log/leaver").await;
    assert_eq!(log.status, StatusCode::NOT_FOUND);
}
