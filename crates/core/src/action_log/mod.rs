//! Per-download status log.
//!
//! Clients poll `GET /log/{download_id}` while a download is in progress to
//! see the last milestone reached. Entries live in memory only and are
//! removed a short while after the download's final milestone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

/// Last recorded milestone for one download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLogEntry {
    pub last_action: String,
    pub updated_at: DateTime<Utc>,
}

/// Shared map of download id to last milestone.
///
/// Cloning is cheap; all clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: Arc<RwLock<HashMap<String, ActionLogEntry>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `action` as the latest milestone, replacing any previous one.
    pub async fn set(&self, download_id: &str, action: impl Into<String>) {
        let entry = ActionLogEntry {
            last_action: action.into(),
            updated_at: Utc::now(),
        };
        debug!(download_id, action = %entry.last_action, "Action log updated");
        self.entries
            .write()
            .await
            .insert(download_id.to_string(), entry);
    }

    pub async fn get(&self, download_id: &str) -> Option<ActionLogEntry> {
        self.entries.read().await.get(download_id).cloned()
    }

    /// Removes the entry. Returns whether one existed.
    pub async fn remove(&self, download_id: &str) -> bool {
        self.entries.write().await.remove(download_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Removes the entry after `delay`.
    ///
    /// An entry rewritten in the meantime is removed anyway: expiry follows
    /// the terminal milestone and nothing is logged after it.
    pub fn schedule_expiry(&self, download_id: &str, delay: Duration) -> JoinHandle<()> {
        let log = self.clone();
        let download_id = download_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if log.remove(&download_id).await {
                debug!(download_id = %download_id, "Action log entry expired");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let log = ActionLog::new();
        assert!(log.get("abc").await.is_none());

        log.set("abc", "Fetching video info").await;
        let first = log.get("abc").await.unwrap();
        assert_eq!(first.last_action, "Fetching video info");

        log.set("abc", "Starting video stream").await;
        let second = log.get("abc").await.unwrap();
        assert_eq!(second.last_action, "Starting video stream");
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let log = ActionLog::new();
        assert!(!log.remove("missing").await);

        log.set("abc", "x").await;
        assert!(log.remove("abc").await);
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let log = ActionLog::new();
        let other = log.clone();
        log.set("abc", "x").await;
        assert!(other.get("abc").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_expiry() {
        let log = ActionLog::new();
        log.set("abc", "Streaming finished").await;
        log.set("other", "Fetching video info").await;

        let handle = log.schedule_expiry("abc", Duration::from_secs(2));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(log.get("abc").await.is_some());

        handle.await.unwrap();
        assert!(log.get("abc").await.is_none());
        assert!(log.get("other").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_of_missing_entry() {
        let log = ActionLog::new();
        log.schedule_expiry("ghost", Duration::from_millis(10))
            .await
            .unwrap();
        assert!(log.is_empty().await);
    }
}
