//! Handle around one spawned OS process.

use bytes::Bytes;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use nix::sys::signal::{self, Signal};
use nix::unistd::{dup2, Pid};
use serde::Serialize;
use std::io::{self, PipeWriter};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::error::ProcessError;

/// Upper bound on descriptors a single child can inherit besides stdio.
pub const MAX_INHERITED_FDS: usize = 8;

/// Inherited descriptors are staged above this number before landing on
/// their targets, so a source can never be clobbered by another target.
const STAGING_FD_FLOOR: RawFd = 64;

/// Where the child's stdout goes.
#[derive(Debug)]
pub enum StdoutMode {
    /// A new pipe whose read end stays with the handle.
    Piped,
    /// `/dev/null`.
    Null,
    /// The write end of an existing pipe, typically read by a sibling process.
    Pipe(PipeWriter),
}

/// A descriptor the child receives at a fixed slot.
#[derive(Debug)]
pub struct InheritedFd {
    pub source: OwnedFd,
    pub target: RawFd,
}

/// Everything needed to start one child process.
#[derive(Debug)]
pub struct ProcessSpec {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdout: StdoutMode,
    pub inherited: Vec<InheritedFd>,
    pub inherit_stderr: bool,
}

impl ProcessSpec {
    /// Creates a spec with piped stdout, no extra descriptors and inherited stderr.
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            stdout: StdoutMode::Piped,
            inherited: Vec::new(),
            inherit_stderr: true,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdout(mut self, mode: StdoutMode) -> Self {
        self.stdout = mode;
        self
    }

    /// Hands `source` to the child as descriptor `target`.
    pub fn inherit_fd(mut self, source: impl Into<OwnedFd>, target: RawFd) -> Self {
        self.inherited.push(InheritedFd {
            source: source.into(),
            target,
        });
        self
    }

    pub fn inherit_stderr(mut self, inherit: bool) -> Self {
        self.inherit_stderr = inherit;
        self
    }
}

/// Result of a graceful-then-forcible stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process had already exited; no signal was sent.
    AlreadyExited,
    /// The process honoured SIGTERM within the grace period.
    Exited,
    /// The process had to be killed.
    Killed,
}

/// Snapshot of a process for reports and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub name: String,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub terminations: u32,
    pub kills: u32,
}

/// A spawned child process.
///
/// Handles are `kill_on_drop`: a handle dropped while its process is still
/// running sends SIGKILL, so no process outlives its owner.
#[derive(Debug)]
pub struct ChildProcess {
    name: String,
    pid: Option<u32>,
    child: Child,
    stdout: Option<ChildStdout>,
    exit_status: Option<ExitStatus>,
    terminations: u32,
    kills: u32,
}

impl ChildProcess {
    /// Spawns the process described by `spec`.
    ///
    /// The parent's copies of the inherited descriptors and of a `Pipe` stdout
    /// are closed before this returns.
    pub fn spawn(spec: ProcessSpec) -> Result<Self, ProcessError> {
        let ProcessSpec {
            name,
            program,
            args,
            stdout,
            inherited,
            inherit_stderr,
        } = spec;

        if inherited.len() > MAX_INHERITED_FDS {
            return Err(ProcessError::TooManyInheritedFds {
                program,
                count: inherited.len(),
                max: MAX_INHERITED_FDS,
            });
        }
        if let Some(bad) = inherited
            .iter()
            .find(|fd| fd.target <= 2 || fd.target >= STAGING_FD_FLOOR)
        {
            return Err(ProcessError::InvalidFdTarget {
                program,
                target: bad.target,
            });
        }

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stderr(if inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        command.stdout(match stdout {
            StdoutMode::Piped => Stdio::piped(),
            StdoutMode::Null => Stdio::null(),
            StdoutMode::Pipe(writer) => Stdio::from(writer),
        });

        if !inherited.is_empty() {
            let mut mappings = [(-1, -1); MAX_INHERITED_FDS];
            for (slot, fd) in mappings.iter_mut().zip(&inherited) {
                *slot = (fd.source.as_raw_fd(), fd.target);
            }
            let count = inherited.len();
            // SAFETY: runs between fork and exec. The closure owns a plain array
            // and only issues fcntl/dup2, both async-signal-safe; it neither
            // allocates nor takes locks.
            unsafe {
                command.pre_exec(move || remap_inherited_fds(&mappings[..count]));
            }
        }

        let mut child = command
            .spawn()
            .map_err(|e| ProcessError::from_spawn(program.clone(), e))?;

        // The command still holds the stdout write end; the child has its own copies now.
        drop(command);
        drop(inherited);

        let pid = child.id();
        let stdout = child.stdout.take();
        debug!(process = %name, pid = ?pid, program = %program.display(), "Spawned process");

        Ok(Self {
            name,
            pid,
            child,
            stdout,
            exit_status: None,
            terminations: 0,
            kills: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Number of SIGTERMs sent to the process.
    pub fn terminations(&self) -> u32 {
        self.terminations
    }

    /// Number of SIGKILLs sent to the process.
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Reads up to `max_bytes` from the piped stdout. `None` means EOF.
    pub async fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Option<Bytes>> {
        let stdout = self.stdout.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{} stdout is not piped to the orchestrator", self.name),
            )
        })?;

        let mut buf = vec![0u8; max_bytes];
        let read = stdout.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some(Bytes::from(buf)))
    }

    /// Drops the orchestrator's read end of stdout.
    pub fn close_stdout(&mut self) {
        self.stdout.take();
    }

    /// Exit status if the process has exited, without blocking.
    pub fn try_exit_status(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit_status.is_none() {
            self.exit_status = self.child.try_wait()?;
        }
        Ok(self.exit_status)
    }

    /// Whether the process may still be running. Unknown state counts as running.
    pub fn is_running(&mut self) -> bool {
        !matches!(self.try_exit_status(), Ok(Some(_)))
    }

    /// Sends SIGTERM. No-op once the process has exited.
    pub fn terminate(&mut self) -> io::Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };

        self.terminations += 1;
        debug!(process = %self.name, pid, "Sending SIGTERM");
        match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sends SIGKILL. No-op once the process has exited.
    pub fn kill(&mut self) -> io::Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        self.kills += 1;
        debug!(process = %self.name, pid = ?self.pid, "Sending SIGKILL");
        self.child.start_kill()
    }

    /// Waits for the process to exit.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Waits at most `duration`. `None` means the process is still running.
    pub async fn wait_timeout(&mut self, duration: Duration) -> io::Result<Option<ExitStatus>> {
        match timeout(duration, self.wait()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Sends SIGKILL if still running and reaps the process.
    pub async fn kill_and_wait(&mut self) -> io::Result<ExitStatus> {
        self.kill()?;
        self.wait().await
    }

    /// SIGTERM, wait `grace`, then SIGKILL and reap.
    pub async fn stop(&mut self, grace: Duration) -> io::Result<StopOutcome> {
        if !self.is_running() {
            return Ok(StopOutcome::AlreadyExited);
        }

        self.terminate()?;
        if self.wait_timeout(grace).await?.is_some() {
            return Ok(StopOutcome::Exited);
        }

        warn!(
            process = %self.name,
            pid = ?self.pid,
            grace_ms = grace.as_millis() as u64,
            "Process ignored SIGTERM, killing"
        );
        self.kill_and_wait().await?;
        Ok(StopOutcome::Killed)
    }

    pub fn report(&self) -> ProcessReport {
        ProcessReport {
            name: self.name.clone(),
            pid: self.pid,
            exit_code: self.exit_status.and_then(|s| s.code()),
            signal: self.exit_status.and_then(|s| s.signal()),
            terminations: self.terminations,
            kills: self.kills,
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(process = %self.name, pid = ?self.pid, "Process handle dropped while running");
        }
    }
}

/// Places each source descriptor on its target slot in the child.
///
/// Sources are first duplicated above `STAGING_FD_FLOOR` (close-on-exec), then
/// `dup2`ed onto their targets, which clears close-on-exec on the targets only.
fn remap_inherited_fds(mappings: &[(RawFd, RawFd)]) -> io::Result<()> {
    let mut staged = [-1 as RawFd; MAX_INHERITED_FDS];
    for (slot, (source, _)) in staged.iter_mut().zip(mappings) {
        *slot = fcntl(*source, FcntlArg::F_DUPFD_CLOEXEC(STAGING_FD_FLOOR))?;
    }
    for (staged_fd, (_, target)) in staged.iter().zip(mappings) {
        dup2(*staged_fd, *target)?;
    }
    Ok(())
}
