//! Streaming download pipeline.
//!
//! A download is served by three external processes: a video fetcher, an
//! audio fetcher and a muxer that combines both into one container on its
//! stdout. [`PipelineBuilder`] turns a [`DownloadRequest`] into command lines,
//! [`PipelineController`] spawns and wires them, and [`Pipeline::stream`]
//! forwards the muxer output to a [`ChunkSink`] until the stream ends, then
//! guarantees every process is gone.

mod builder;
mod controller;
mod error;
mod format;
mod sink;
mod types;

pub use builder::{PipelineBuilder, AUDIO_INPUT_FD, VIDEO_INPUT_FD};
pub use controller::{Pipeline, PipelineController};
pub use error::PipelineError;
pub use format::{FormatChain, FormatStage, StreamKind};
pub use sink::{BodyChunk, ChannelSink, ChunkSink, BODY_CHANNEL_CAPACITY};
pub use types::{
    parse_quality, CommandLine, Container, DownloadRequest, PipelinePlan, PipelineState,
    RequestError, StreamEnd, StreamReport,
};
