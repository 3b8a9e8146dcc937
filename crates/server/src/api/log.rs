//! Action log lookup.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LogEntryResponse {
    pub download_id: String,
    pub last_action: String,
    pub updated_at: String,
}

/// Last recorded milestone for a download.
pub async fn get_log_entry(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<String>,
) -> Result<Json<LogEntryResponse>, ApiError> {
    let entry = state
        .action_log()
        .get(&download_id)
        .await
        .ok_or_else(|| ApiError::not_found("Log not found for this ID."))?;

    Ok(Json(LogEntryResponse {
        download_id,
        last_action: entry.last_action,
        updated_at: entry.updated_at.to_rfc3339(),
    }))
}
