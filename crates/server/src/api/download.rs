//! `POST /download`: metadata lookup, then a streamed, muxed download.

use axum::{
    body::Body,
    extract::{rejection::FormRejection, Form, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::stream;
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use pipestream_core::{
    naming::{content_disposition, download_filename},
    ActionLog, ChannelSink, DownloadRequest, Pipeline, StreamEnd,
};

use super::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Form fields. All optional so validation errors can carry a useful message.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadForm {
    pub url: Option<String>,
    pub quality: Option<String>,
    pub container: Option<String>,
    pub download_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Validates the form, fetches metadata, spawns the pipeline and returns a
/// chunked response fed by a background streaming task.
///
/// Errors before the pipeline is running are returned as JSON; after that
/// the response is committed and failures can only truncate the body.
pub async fn download(
    State(state): State<Arc<AppState>>,
    form: Result<Form<DownloadForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(form) = form.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let request = DownloadRequest::parse(
        form.url.as_deref(),
        form.quality.as_deref(),
        form.container.as_deref(),
        form.download_id.as_deref(),
        state.config().streaming.default_container,
    )?;
    let download_id = request.download_id.clone();
    let log = state.action_log();

    log.set(&download_id, format!("Fetching video info for: {}", request.url))
        .await;
    // From here on the entry expires however the request ends
    let entry = ExpiringEntry::new(
        log.clone(),
        &download_id,
        state.config().action_log.expiry(),
    );

    let metadata = match state.metadata().fetch(&request.url).await {
        Ok(metadata) => metadata,
        Err(e) => {
            let err = ApiError::from(e);
            entry.finish(err.detail.clone()).await;
            return Err(err);
        }
    };

    let filename = download_filename(metadata.title(), request.container);
    let plan = state.builder().build(&request);
    info!(
        download_id = %download_id,
        filename = %filename,
        quality = ?request.quality,
        container = %request.container,
        "Starting download"
    );

    log.set(
        &download_id,
        format!(
            "Starting video stream for '{}' (as {})...",
            filename,
            request.container.extension().to_uppercase()
        ),
    )
    .await;
    let pipeline = match state.controller().spawn(&plan).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            let err = ApiError::from(e);
            entry.finish(err.detail.clone()).await;
            return Err(err);
        }
    };

    let (sink, rx) = ChannelSink::body();
    tokio::spawn(stream_to_client(pipeline, sink, entry));

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, request.container.mime_type())
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

// ============================================================================
// Streaming
// ============================================================================

/// Runs the pipeline into the response body, then records the outcome.
async fn stream_to_client(pipeline: Pipeline, mut sink: ChannelSink, entry: ExpiringEntry) {
    let download_id = entry.download_id.as_str();
    let outcome = match pipeline.stream(&mut sink).await {
        Ok(report) => match report.end {
            StreamEnd::Completed if report.muxer.exit_code == Some(0) => {
                info!(download_id = %download_id, bytes = report.bytes_sent, "Download complete");
                "Streaming finished".to_string()
            }
            StreamEnd::Completed => {
                warn!(
                    download_id = %download_id,
                    muxer_exit = ?report.muxer.exit_code,
                    "Download ended with muxer error"
                );
                format!(
                    "Streaming finished with errors (muxer exit code {:?})",
                    report.muxer.exit_code
                )
            }
            StreamEnd::ClientDisconnected => {
                info!(download_id = %download_id, bytes = report.bytes_sent, "Download cancelled by client");
                "Client disconnected".to_string()
            }
        },
        Err(e) => {
            error!(download_id = %download_id, error = %e, "Download stream failed");
            sink.fail(io::Error::other(e.to_string())).await;
            format!("Streaming failed: {}", e)
        }
    };

    entry.finish(outcome).await;
}

// ============================================================================
// Log Entry Lifetime
// ============================================================================

/// A download's action log entry. Dropping it schedules the entry's removal,
/// so an abandoned request still expires its entry.
struct ExpiringEntry {
    log: ActionLog,
    download_id: String,
    expiry: Duration,
}

impl ExpiringEntry {
    fn new(log: ActionLog, download_id: &str, expiry: Duration) -> Self {
        Self {
            log,
            download_id: download_id.to_string(),
            expiry,
        }
    }

    /// Records the terminal milestone; expiry follows on drop.
    async fn finish(self, action: String) {
        self.log.set(&self.download_id, action).await;
    }
}

impl Drop for ExpiringEntry {
    fn drop(&mut self) {
        debug!(download_id = %self.download_id, "Scheduling action log expiry");
        self.log.schedule_expiry(&self.download_id, self.expiry);
    }
}
