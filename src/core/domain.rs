use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::WAIT_SLICE_MS;
use crate::core::compare::DiffReport;
use crate::core::errors::LaunchFailure;

/// Rounds a requested time limit up to the next multiple of the wait slice.
pub fn effective_limit_ms(requested_ms: u64) -> u64 {
    requested_ms.div_ceil(WAIT_SLICE_MS) * WAIT_SLICE_MS
}

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub executable: PathBuf,
    /// Parent directory of the executable, if it has one.
    pub working_dir: Option<PathBuf>,
    /// Raw bytes of the input file, passed through untouched.
    pub stdin: Vec<u8>,
    pub time_limit_ms: u64,
}

impl RunRequest {
    pub fn new(executable: &Path, stdin: &[u8], time_limit_ms: u64) -> Self {
        let working_dir = executable
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);

        Self {
            executable: executable.to_path_buf(),
            working_dir,
            stdin: stdin.to_vec(),
            time_limit_ms,
        }
    }

    /// A zero limit still gets one slice, otherwise the overload ceiling
    /// would be zero as well.
    pub fn effective_limit_ms(&self) -> u64 {
        effective_limit_ms(self.time_limit_ms.max(1))
    }

    /// Bytes to feed the child, or `None` when there is no input at all.
    pub fn payload(&self, eof_marker: Option<u8>) -> Option<Vec<u8>> {
        if self.stdin.is_empty() {
            return None;
        }
        let mut payload = Vec::with_capacity(self.stdin.len() + 1);
        payload.extend_from_slice(&self.stdin);
        payload.extend(eof_marker);
        Some(payload)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutReason {
    #[error("execution timeout")]
    ExecutionTimeout,
    #[error("judge overloaded")]
    JudgeOverloaded,
    #[error("suspected blocking")]
    SuspectedBlocking,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        captured_output: String,
        cpu_time_ms: u64,
        wall_time_ms: u64,
        exit_code: i32,
    },
    TimedOut {
        reason: TimeoutReason,
    },
    LaunchFailed {
        reason: LaunchFailure,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JudgeVerdict {
    Accepted(u64),
    WrongAnswer(DiffReport),
    TimeLimitExceeded(TimeoutReason),
    StartFailed(String),
}

impl JudgeVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, JudgeVerdict::Accepted(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            JudgeVerdict::Accepted(_) => "AC",
            JudgeVerdict::WrongAnswer(_) => "WA",
            JudgeVerdict::TimeLimitExceeded(_) => "TLE",
            JudgeVerdict::StartFailed(_) => "START FAILED",
        }
    }
}

impl fmt::Display for JudgeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgeVerdict::Accepted(elapsed_ms) => write!(f, "AC in {elapsed_ms} ms"),
            JudgeVerdict::WrongAnswer(diff) => write!(f, "WA\n{diff}"),
            JudgeVerdict::TimeLimitExceeded(reason) => write!(f, "TLE: {reason}"),
            JudgeVerdict::StartFailed(reason) => write!(f, "START FAILED: {reason}"),
        }
    }
}

/// An input file and the expected-output file paired with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub input: PathBuf,
    pub expected: PathBuf,
}
