use std::time::Duration;

use crate::config::HarnessConfig;
use crate::constants::WAIT_SLICE_MS;
use crate::core::domain::TimeoutReason;
use crate::core::traits::probe::ProcessProbe;

#[derive(Debug, PartialEq, Eq)]
pub enum SliceVerdict {
    Wait,
    Timeout(TimeoutReason),
}

/// Decides, slice by slice, whether a silent process has run out of time.
///
/// Every idle slice first drains the budget of `limit / slice` units. Once the
/// budget is gone each further slice runs three checks in order: CPU time over
/// the limit, wall clock over the overload ceiling, and CPU progress since the
/// previous sample. A process that keeps computing may therefore run past its
/// nominal budget until it actually burns the limit in CPU time.
#[derive(Debug)]
pub struct Supervisor {
    limit_ms: u64,
    budget: u64,
    overload_ceiling: Duration,
    min_progress: u64,
    last_progress: u64,
}

impl Supervisor {
    pub fn new(effective_limit_ms: u64, config: &HarnessConfig) -> Self {
        Self {
            limit_ms: effective_limit_ms,
            budget: effective_limit_ms.div_ceil(WAIT_SLICE_MS),
            overload_ceiling: Duration::from_millis(
                effective_limit_ms.saturating_mul(config.overload_factor),
            ),
            min_progress: config.min_cpu_progress_ns,
            last_progress: 0,
        }
    }

    /// Called after a slice passed without exit or teardown.
    pub fn on_idle_slice(&mut self, probe: &impl ProcessProbe, elapsed: Duration) -> SliceVerdict {
        if self.budget > 0 {
            self.budget -= 1;
            return SliceVerdict::Wait;
        }

        match probe.cpu_time_ms() {
            Ok(cpu_time_ms) if cpu_time_ms > self.limit_ms => {
                tracing::info!(cpu_time_ms, limit_ms = self.limit_ms, "cpu time exhausted");
                return SliceVerdict::Timeout(TimeoutReason::ExecutionTimeout);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("cpu time unavailable: {e}"),
        }

        if elapsed > self.overload_ceiling {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "wall clock passed the overload ceiling"
            );
            return SliceVerdict::Timeout(TimeoutReason::JudgeOverloaded);
        }

        let progress = match probe.cpu_progress() {
            Ok(progress) => progress,
            Err(e) => {
                tracing::debug!("cpu progress unavailable: {e}");
                return SliceVerdict::Wait;
            }
        };
        if progress.saturating_sub(self.last_progress) < self.min_progress {
            tracing::info!(progress, last = self.last_progress, "no cpu progress");
            return SliceVerdict::Timeout(TimeoutReason::SuspectedBlocking);
        }
        self.last_progress = progress;

        SliceVerdict::Wait
    }
}
