//! Mock metadata fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::metadata::{MetadataError, MetadataFetcher, VideoMetadata};

/// Mock implementation of the MetadataFetcher trait.
///
/// Returns a configurable [`VideoMetadata`] for every URL, records the URLs
/// it was asked about and can be told to fail the next fetch.
///
/// # Example
///
/// ```rust,ignore
/// use pipestream_core::testing::MockMetadataFetcher;
///
/// let fetcher = MockMetadataFetcher::with_title("Some Clip");
/// fetcher.set_next_error(MetadataError::fetch_failed(Some(1), "ERROR: Unsupported URL")).await;
///
/// assert!(fetcher.fetch("https://example.com/v").await.is_err());
/// assert_eq!(fetcher.fetched_urls().await, vec!["https://example.com/v"]);
/// ```
#[derive(Debug, Clone)]
pub struct MockMetadataFetcher {
    /// Metadata returned on success.
    metadata: Arc<RwLock<VideoMetadata>>,
    /// URLs passed to `fetch`, in order.
    fetched: Arc<RwLock<Vec<String>>>,
    /// If set, the next fetch fails with this error.
    next_error: Arc<RwLock<Option<MetadataError>>>,
    /// Simulated latency.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockMetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMetadataFetcher {
    /// Create a mock returning metadata titled "Test Video".
    pub fn new() -> Self {
        Self::with_metadata(VideoMetadata::with_title("Test Video"))
    }

    pub fn with_title(title: &str) -> Self {
        Self::with_metadata(VideoMetadata::with_title(title))
    }

    pub fn with_metadata(metadata: VideoMetadata) -> Self {
        Self {
            metadata: Arc::new(RwLock::new(metadata)),
            fetched: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the metadata returned by subsequent fetches.
    pub async fn set_metadata(&self, metadata: VideoMetadata) {
        *self.metadata.write().await = metadata;
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: MetadataError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every fetch take at least `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// URLs fetched so far.
    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }
}

#[async_trait]
impl MetadataFetcher for MockMetadataFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str) -> Result<VideoMetadata, MetadataError> {
        self.fetched.write().await.push(url.to_string());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.metadata.read().await.clone())
    }
}
