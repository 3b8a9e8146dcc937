//! In-memory chunk sinks.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;

use crate::pipeline::ChunkSink;

/// Collects every chunk. Can simulate a client that leaves after a number of
/// chunks, or a transport that fails.
#[derive(Debug, Default)]
pub struct RecordingSink {
    chunks: Vec<Bytes>,
    disconnect_after: Option<usize>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a disconnect once `chunks` chunks were accepted.
    pub fn disconnect_after(chunks: usize) -> Self {
        Self {
            disconnect_after: Some(chunks),
            ..Self::default()
        }
    }

    /// Fails the send after `chunks` chunks were accepted, while still
    /// reporting the client as connected.
    pub fn fail_after(chunks: usize) -> Self {
        Self {
            fail_after: Some(chunks),
            ..Self::default()
        }
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

#[async_trait]
impl ChunkSink for RecordingSink {
    fn is_disconnected(&self) -> bool {
        self.disconnect_after
            .is_some_and(|limit| self.chunks.len() >= limit)
    }

    async fn send(&mut self, chunk: Bytes) -> io::Result<()> {
        if self.is_disconnected() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "disconnected"));
        }
        if self.fail_after.is_some_and(|limit| self.chunks.len() >= limit) {
            return Err(io::Error::other("transport failure"));
        }
        self.chunks.push(chunk);
        Ok(())
    }
}
