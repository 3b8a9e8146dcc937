//! Child process handles.
//!
//! [`ChildProcess`] wraps one spawned OS process and exposes its stdout as a
//! chunked reader plus a two-tier termination contract (SIGTERM, then SIGKILL).
//! A child can inherit arbitrary descriptors at fixed slots, which is how the
//! muxer reads straight from the fetch processes' pipes.

mod child;
mod error;

pub use child::{
    ChildProcess, InheritedFd, ProcessReport, ProcessSpec, StdoutMode, StopOutcome,
    MAX_INHERITED_FDS,
};
pub use error::ProcessError;
