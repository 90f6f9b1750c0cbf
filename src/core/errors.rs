use std::io;
use std::path::PathBuf;

use nix::sys::signal::Signal;

/// Why a run produced no output worth comparing. The `Display` text is the
/// diagnostic shown to the operator.
#[derive(Debug, thiserror::Error)]
pub enum LaunchFailure {
    #[error("failed to create input pipe: {0}")]
    InputPipe(io::Error),

    #[error("failed to create output pipe: {0}")]
    OutputPipe(io::Error),

    #[error("failed to create process: {0}")]
    Spawn(io::Error),

    #[error("failed to wait for process: {0}")]
    Wait(io::Error),

    #[error("unexpected process state: {0}")]
    UnexpectedStatus(String),

    #[error("non-zero exit {0}")]
    NonZeroExit(i32),

    #[error("terminated by signal {0:?}")]
    Signaled(Signal),

    #[error("harness shutting down")]
    ShuttingDown,
}

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
}
