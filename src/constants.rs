/// Granularity of the exit/teardown wait and of the time budget.
pub const WAIT_SLICE_MS: u64 = 100;

/// How often the output monitor checks the pipe for new bytes.
pub const OUTPUT_POLL_MS: u64 = 10;

/// Wall-clock ceiling, as a multiple of the effective time limit, past which
/// the host is considered too loaded to judge fairly.
pub const OVERLOAD_FACTOR: u64 = 40;

/// Minimal on-CPU time (ns) a process must accumulate between two samples
/// to count as making progress.
pub const MIN_CPU_PROGRESS_NS: u64 = 1_000_000;

/// End-of-transmission byte appended to non-empty stdin payloads.
pub const EOF_MARKER: u8 = 0x04;

pub const DEFAULT_TIME_LIMIT_MS: u64 = 1000;
pub const DEFAULT_INPUT_EXTENSION: &str = ".in";
pub const DEFAULT_OUTPUT_EXTENSION: &str = ".out";
