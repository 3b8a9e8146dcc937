//! Spawns the three-process pipeline and drives it to completion.
//!
//! Wiring:
//!
//! ```text
//! video fetch ──stdout──▶ pipe ──fd 3──┐
//!                                      ├──▶ muxer ──stdout──▶ orchestrator ──▶ sink
//! audio fetch ──stdout──▶ pipe ──fd 4──┘
//! ```
//!
//! The orchestrator holds no pipe ends between the fetchers and the muxer, so
//! EOF and SIGPIPE propagate between the processes directly.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::StreamingConfig;
use crate::metrics::{
    BYTES_STREAMED, PROCESS_GRACEFUL_STOPS, PROCESS_KILLS, PROCESS_SPAWN_FAILURES,
    STREAMS_ACTIVE, STREAMS_FINISHED, STREAMS_STARTED, STREAM_DURATION,
};
use crate::process::{ChildProcess, ProcessError, ProcessSpec, StdoutMode, StopOutcome};

use super::builder::{AUDIO_INPUT_FD, VIDEO_INPUT_FD};
use super::error::PipelineError;
use super::sink::ChunkSink;
use super::types::{CommandLine, Container, PipelinePlan, PipelineState, StreamEnd, StreamReport};

/// Starts pipelines.
#[derive(Debug, Clone)]
pub struct PipelineController {
    config: StreamingConfig,
    inherit_stderr: bool,
}

impl PipelineController {
    pub fn new(config: StreamingConfig, inherit_stderr: bool) -> Self {
        Self {
            config,
            inherit_stderr,
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Spawns video fetch, audio fetch, then the muxer.
    ///
    /// If any stage fails, processes already started are killed and reaped
    /// before the error is returned.
    pub async fn spawn(&self, plan: &PipelinePlan) -> Result<Pipeline, PipelineError> {
        let (video_reader, video_writer) = io::pipe()?;
        let (audio_reader, audio_writer) = io::pipe()?;

        let mut video = self
            .start("video", &plan.video, |spec| {
                spec.stdout(StdoutMode::Pipe(video_writer))
            })
            .map_err(|e| PipelineError::spawn_failed("video", e))?;

        let mut audio = match self.start("audio", &plan.audio, |spec| {
            spec.stdout(StdoutMode::Pipe(audio_writer))
        }) {
            Ok(audio) => audio,
            Err(e) => {
                abort_started(&mut [&mut video]).await;
                return Err(PipelineError::spawn_failed("audio", e));
            }
        };

        let muxer = match self.start("muxer", &plan.muxer, |spec| {
            spec.stdout(StdoutMode::Piped)
                .inherit_fd(video_reader, VIDEO_INPUT_FD)
                .inherit_fd(audio_reader, AUDIO_INPUT_FD)
        }) {
            Ok(muxer) => muxer,
            Err(e) => {
                abort_started(&mut [&mut video, &mut audio]).await;
                return Err(PipelineError::spawn_failed("muxer", e));
            }
        };

        info!(
            video_pid = ?video.pid(),
            audio_pid = ?audio.pid(),
            muxer_pid = ?muxer.pid(),
            container = %plan.container,
            "Pipeline spawned"
        );

        Ok(Pipeline {
            video,
            audio,
            muxer,
            container: plan.container,
            state: PipelineState::Spawned,
            config: self.config.clone(),
            bytes_sent: 0,
            chunks_sent: 0,
        })
    }

    fn start(
        &self,
        name: &str,
        command: &CommandLine,
        configure: impl FnOnce(ProcessSpec) -> ProcessSpec,
    ) -> Result<ChildProcess, ProcessError> {
        debug!(process = name, command = %command.display(), "Starting process");
        let spec = ProcessSpec::new(name, command.program.clone())
            .args(command.args.iter().cloned())
            .inherit_stderr(self.inherit_stderr);

        ChildProcess::spawn(configure(spec)).inspect_err(|e| {
            PROCESS_SPAWN_FAILURES.with_label_values(&[name]).inc();
            error!(process = name, error = %e, "Failed to start process");
        })
    }
}

/// Kills and reaps processes started before a later stage failed.
async fn abort_started(processes: &mut [&mut ChildProcess]) {
    for process in processes.iter_mut() {
        if let Err(e) = process.kill_and_wait().await {
            warn!(process = process.name(), error = %e, "Failed to reap aborted process");
        }
    }
}

/// A running video-fetch / audio-fetch / muxer trio.
///
/// Owned by exactly one streaming response. Dropping it without calling
/// [`Pipeline::stream`] kills all three processes.
#[derive(Debug)]
pub struct Pipeline {
    video: ChildProcess,
    audio: ChildProcess,
    muxer: ChildProcess,
    container: Container,
    state: PipelineState,
    config: StreamingConfig,
    bytes_sent: u64,
    chunks_sent: u64,
}

impl Pipeline {
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// Forwards muxer output to `sink` until EOF, disconnect or error, then
    /// tears the pipeline down. No process is left running on return.
    pub async fn stream<S>(mut self, sink: &mut S) -> Result<StreamReport, PipelineError>
    where
        S: ChunkSink + ?Sized,
    {
        let started = Instant::now();
        STREAMS_STARTED.inc();
        STREAMS_ACTIVE.inc();
        self.transition(PipelineState::Streaming);

        let outcome = self.pump(sink).await;

        self.transition(PipelineState::Draining);
        match &outcome {
            Ok(StreamEnd::Completed) => {
                self.drain_muxer().await;
                self.drain_fetchers().await;
            }
            Ok(StreamEnd::ClientDisconnected) => {
                self.stop_muxer().await;
                self.drain_fetchers().await;
            }
            Err(e) => {
                error!(error = %e, bytes_sent = self.bytes_sent, "Stream aborted");
                self.kill_running().await;
            }
        }

        self.final_sweep().await;
        self.transition(PipelineState::Terminated);

        let label = match &outcome {
            Ok(StreamEnd::Completed) => "completed",
            Ok(StreamEnd::ClientDisconnected) => "disconnected",
            Err(_) => "failed",
        };
        STREAMS_ACTIVE.dec();
        STREAMS_FINISHED.with_label_values(&[label]).inc();
        STREAM_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        let end = outcome?;
        let report = StreamReport {
            end,
            final_state: self.state,
            bytes_sent: self.bytes_sent,
            chunks_sent: self.chunks_sent,
            video: self.video.report(),
            audio: self.audio.report(),
            muxer: self.muxer.report(),
        };
        info!(
            end = ?report.end,
            bytes_sent = report.bytes_sent,
            chunks_sent = report.chunks_sent,
            muxer_exit = ?report.muxer.exit_code,
            "Stream finished"
        );
        Ok(report)
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    /// Moves chunks from the muxer to the sink, one at a time.
    async fn pump<S>(&mut self, sink: &mut S) -> Result<StreamEnd, PipelineError>
    where
        S: ChunkSink + ?Sized,
    {
        let chunk_size = self.config.chunk_size;
        loop {
            if sink.is_disconnected() {
                info!(bytes_sent = self.bytes_sent, "Client disconnected");
                return Ok(StreamEnd::ClientDisconnected);
            }

            let read = tokio::select! {
                biased;
                read = self.muxer.read_chunk(chunk_size) => read,
                _ = sink.disconnected() => {
                    info!(bytes_sent = self.bytes_sent, "Client disconnected while waiting for output");
                    return Ok(StreamEnd::ClientDisconnected);
                }
            };

            let chunk = match read {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    debug!(bytes_sent = self.bytes_sent, "Muxer output reached EOF");
                    return Ok(StreamEnd::Completed);
                }
                Err(e) => return Err(PipelineError::Stream(e)),
            };

            let len = chunk.len() as u64;
            if let Err(e) = sink.send(chunk).await {
                if sink.is_disconnected() {
                    info!(bytes_sent = self.bytes_sent, "Client disconnected during send");
                    return Ok(StreamEnd::ClientDisconnected);
                }
                return Err(PipelineError::Forward(e));
            }
            self.bytes_sent += len;
            self.chunks_sent += 1;
            BYTES_STREAMED.inc_by(len);
        }
    }

    /// After EOF: the muxer should exit on its own.
    async fn drain_muxer(&mut self) {
        let limit = self.config.muxer_exit_timeout();
        match self.muxer.wait_timeout(limit).await {
            Ok(Some(status)) if status.success() => {
                debug!("Muxer exited cleanly");
            }
            Ok(Some(status)) => {
                error!(exit_code = ?status.code(), "Muxer exited with an error");
            }
            Ok(None) => {
                warn!(
                    timeout_secs = limit.as_secs(),
                    "Muxer still running after EOF, killing"
                );
                kill_and_reap(&mut self.muxer).await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to wait for muxer");
            }
        }
    }

    /// After a disconnect: SIGTERM once, escalate on timeout, then drop our
    /// read end of the muxer output.
    async fn stop_muxer(&mut self) {
        let grace = self.config.muxer_stop_timeout();
        match self.muxer.stop(grace).await {
            Ok(outcome) => record_stop(self.muxer.name(), outcome),
            Err(e) => warn!(error = %e, "Failed to stop muxer"),
        }
        self.muxer.close_stdout();
    }

    /// Waits for each fetch process, killing any that outlive the timeout.
    async fn drain_fetchers(&mut self) {
        let limit = self.config.fetch_exit_timeout();
        for process in [&mut self.video, &mut self.audio] {
            match process.wait_timeout(limit).await {
                Ok(Some(status)) if status.success() => {
                    debug!(process = process.name(), "Fetch process exited cleanly");
                }
                Ok(Some(status)) => {
                    // Expected after a disconnect: the muxer closed its inputs
                    warn!(
                        process = process.name(),
                        exit_code = ?status.code(),
                        signal = ?status.signal(),
                        "Fetch process exited with an error"
                    );
                }
                Ok(None) => {
                    warn!(
                        process = process.name(),
                        timeout_secs = limit.as_secs(),
                        "Fetch process still running, killing"
                    );
                    kill_and_reap(process).await;
                }
                Err(e) => {
                    warn!(process = process.name(), error = %e, "Failed to wait for fetch process");
                }
            }
        }
    }

    /// Error path: kill whatever is still alive.
    async fn kill_running(&mut self) {
        for process in [&mut self.muxer, &mut self.video, &mut self.audio] {
            if process.is_running() {
                kill_and_reap(process).await;
            }
        }
    }

    /// Last line of defence, runs on every path.
    async fn final_sweep(&mut self) {
        let grace = self.config.sweep_grace();
        for process in [&mut self.muxer, &mut self.video, &mut self.audio] {
            if !process.is_running() {
                continue;
            }
            warn!(process = process.name(), pid = ?process.pid(), "Process survived teardown, stopping");
            match process.stop(grace).await {
                Ok(outcome) => record_stop(process.name(), outcome),
                Err(e) => error!(process = process.name(), error = %e, "Failed to stop process"),
            }
        }
    }
}

async fn kill_and_reap(process: &mut ChildProcess) {
    match process.kill_and_wait().await {
        Ok(_) => PROCESS_KILLS.with_label_values(&[process.name()]).inc(),
        Err(e) => error!(process = process.name(), error = %e, "Failed to kill process"),
    }
}

fn record_stop(name: &str, outcome: StopOutcome) {
    match outcome {
        StopOutcome::AlreadyExited => {}
        StopOutcome::Exited => PROCESS_GRACEFUL_STOPS.with_label_values(&[name]).inc(),
        StopOutcome::Killed => PROCESS_KILLS.with_label_values(&[name]).inc(),
    }
}
