use std::time::Duration;

use crate::constants::{
    DEFAULT_INPUT_EXTENSION, DEFAULT_OUTPUT_EXTENSION, DEFAULT_TIME_LIMIT_MS, EOF_MARKER,
    MIN_CPU_PROGRESS_NS, OUTPUT_POLL_MS, OVERLOAD_FACTOR,
};

/// Tunables of a single [`Harness`](crate::native::harness::Harness).
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub poll_interval: Duration,
    pub overload_factor: u64,
    pub min_cpu_progress_ns: u64,
    /// Byte appended to non-empty stdin payloads. `None` sends the payload as is.
    pub eof_marker: Option<u8>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(OUTPUT_POLL_MS),
            overload_factor: OVERLOAD_FACTOR,
            min_cpu_progress_ns: MIN_CPU_PROGRESS_NS,
            eof_marker: Some(EOF_MARKER),
        }
    }
}

#[derive(Clone, Debug)]
pub struct JudgeConfig {
    pub time_limit_ms: u64,
    /// Compare lines byte for byte instead of ignoring trailing spaces.
    pub strict: bool,
    pub input_extension: String,
    pub output_extension: String,
    pub harness: HarnessConfig,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            strict: false,
            input_extension: DEFAULT_INPUT_EXTENSION.to_string(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            harness: HarnessConfig::default(),
        }
    }
}
