//! Destinations for muxer output.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use tokio::sync::mpsc;

/// Receives muxer output one chunk at a time.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Whether the consumer has gone away.
    fn is_disconnected(&self) -> bool;

    /// Resolves once the consumer has gone away. Never resolves by default.
    async fn disconnected(&self) {
        std::future::pending::<()>().await
    }

    /// Forwards one chunk. Returns once the consumer has accepted it.
    async fn send(&mut self, chunk: Bytes) -> io::Result<()>;
}

/// Item type of the HTTP body stream fed by a [`ChannelSink`].
pub type BodyChunk = Result<Bytes, io::Error>;

/// Chunks a response body may hold ahead of its reader.
pub const BODY_CHANNEL_CAPACITY: usize = 1;

/// Feeds a bounded channel whose receiver backs an HTTP response body.
///
/// The receiver is dropped when the client disconnects, which this sink
/// reports through [`ChunkSink::is_disconnected`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BodyChunk>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<BodyChunk>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the receiver for the body stream.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BodyChunk>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sink for an HTTP response body: at most one chunk waits for the client.
    pub fn body() -> (Self, mpsc::Receiver<BodyChunk>) {
        Self::channel(BODY_CHANNEL_CAPACITY)
    }

    /// Pushes a terminal error into the body so the response is aborted
    /// instead of ending as if complete.
    pub async fn fail(&self, err: io::Error) {
        // Nothing to abort if the client is already gone
        let _ = self.tx.send(Err(err)).await;
    }
}

#[async_trait]
impl ChunkSink for ChannelSink {
    fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }

    async fn disconnected(&self) {
        self.tx.closed().await
    }

    async fn send(&mut self, chunk: Bytes) -> io::Result<()> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_chunks() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        sink.send(Bytes::from_static(b"abc")).await.unwrap();
        assert!(!sink.is_disconnected());

        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"abc");
    }

    #[tokio::test]
    async fn test_channel_sink_detects_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::channel(4);
        drop(rx);

        assert!(sink.is_disconnected());
        sink.disconnected().await;
        let err = sink.send(Bytes::from_static(b"late")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_body_sink_holds_one_chunk_ahead() {
        let (mut sink, mut rx) = ChannelSink::body();
        sink.send(Bytes::from_static(b"first")).await.unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            sink.send(Bytes::from_static(b"second")),
        )
        .await;
        assert!(blocked.is_err(), "second chunk was buffered");

        assert_eq!(&rx.recv().await.unwrap().unwrap()[..], b"first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channel_sink_fail_delivers_error() {
        let (sink, mut rx) = ChannelSink::channel(1);
        sink.fail(io::Error::other("muxer crashed")).await;

        let item = rx.recv().await.unwrap();
        assert!(item.is_err());
    }
}
