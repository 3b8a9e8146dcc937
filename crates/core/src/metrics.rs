//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Streaming pipelines (starts, outcomes, bytes, duration)
//! - Child processes (graceful stops, kills, spawn failures)
//! - Metadata fetches

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Stream Metrics
// =============================================================================

/// Streams started total.
pub static STREAMS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pipestream_streams_started_total",
        "Total streaming pipelines spawned",
    )
    .unwrap()
});

/// Streams finished total by outcome.
pub static STREAMS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipestream_streams_finished_total",
            "Total streaming pipelines finished",
        ),
        &["outcome"], // "completed", "disconnected", "failed"
    )
    .unwrap()
});

/// Streams currently running.
pub static STREAMS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pipestream_streams_active",
        "Number of streaming pipelines currently running",
    )
    .unwrap()
});

/// Bytes forwarded to clients.
pub static BYTES_STREAMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pipestream_bytes_streamed_total",
        "Total muxer output bytes forwarded to clients",
    )
    .unwrap()
});

/// Stream duration in seconds.
pub static STREAM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pipestream_stream_duration_seconds",
            "Duration of streaming pipelines",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Process Metrics
// =============================================================================

/// Processes that exited within their stop grace period.
pub static PROCESS_GRACEFUL_STOPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipestream_process_graceful_stops_total",
            "Processes that exited after SIGTERM",
        ),
        &["process"], // "video", "audio", "muxer"
    )
    .unwrap()
});

/// Processes that had to be killed.
pub static PROCESS_KILLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pipestream_process_kills_total", "Processes killed"),
        &["process"],
    )
    .unwrap()
});

/// Spawn failures by stage.
pub static PROCESS_SPAWN_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipestream_process_spawn_failures_total",
            "Processes that failed to start",
        ),
        &["process"],
    )
    .unwrap()
});

// =============================================================================
// Metadata Metrics
// =============================================================================

/// Metadata fetches by result.
pub static METADATA_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pipestream_metadata_fetches_total",
            "Total metadata fetches",
        ),
        &["result"], // "success", "failed", "parse_error", "timeout", "error"
    )
    .unwrap()
});

/// Metadata fetch duration in seconds.
pub static METADATA_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pipestream_metadata_fetch_duration_seconds",
            "Duration of metadata fetches",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Streams
        Box::new(STREAMS_STARTED.clone()),
        Box::new(STREAMS_FINISHED.clone()),
        Box::new(STREAMS_ACTIVE.clone()),
        Box::new(BYTES_STREAMED.clone()),
        Box::new(STREAM_DURATION.clone()),
        // Processes
        Box::new(PROCESS_GRACEFUL_STOPS.clone()),
        Box::new(PROCESS_KILLS.clone()),
        Box::new(PROCESS_SPAWN_FAILURES.clone()),
        // Metadata
        Box::new(METADATA_FETCHES.clone()),
        Box::new(METADATA_FETCH_DURATION.clone()),
    ]
}
