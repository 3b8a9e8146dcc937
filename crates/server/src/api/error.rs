//! Error responses for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use pipestream_core::{MetadataError, PipelineError, RequestError};

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// An error returned before a response body has started.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "Request failed");
        }
        (
            self.status,
            Json(ErrorResponse {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        match err {
            // The tool rejected the URL; the client can fix that
            MetadataError::FetchFailed { stderr, .. } => {
                Self::bad_request(format!("Failed to get video info: {}", stderr))
            }
            MetadataError::ParseFailed { reason } => {
                Self::internal(format!("Error parsing video information: {}", reason))
            }
            timeout @ MetadataError::Timeout { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, timeout.to_string())
            }
            other => Self::internal(format!("An internal server error occurred: {}", other)),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::internal(format!("Failed to start video stream: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_fetch_failure_is_bad_request() {
        let err: ApiError =
            MetadataError::fetch_failed(Some(1), "ERROR: Unsupported URL: x").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Failed to get video info: ERROR: Unsupported URL: x");
    }

    #[test]
    fn test_metadata_parse_failure_is_internal() {
        let err: ApiError = MetadataError::parse_failed("invalid JSON").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_request_error_is_bad_request() {
        let err: ApiError = RequestError::MissingUrl.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "URL parameter is missing.");
    }
}
