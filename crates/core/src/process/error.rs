//! Error types for the process module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while constructing a child process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable could not be found.
    #[error("Executable not found: {program}")]
    NotFound { program: PathBuf },

    /// Fork/exec or descriptor setup failed.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An inherited descriptor targets a slot the handle cannot remap.
    #[error("Invalid inherited descriptor target {target} for {program}")]
    InvalidFdTarget { program: PathBuf, target: i32 },

    /// More inherited descriptors than the child-side remap table holds.
    #[error("Too many inherited descriptors for {program}: {count} (max {max})")]
    TooManyInheritedFds {
        program: PathBuf,
        count: usize,
        max: usize,
    },

    /// I/O error while creating the plumbing around the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    pub(crate) fn from_spawn(program: PathBuf, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { program }
        } else {
            Self::Spawn {
                program,
                source: err,
            }
        }
    }
}
