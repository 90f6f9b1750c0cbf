use std::io;
use std::process::Command;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::Pid;

/// Owns a spawned child until it is reaped.
///
/// Dropping an unreaped guard kills the child and waits for it, so no
/// process outlives the launch that created it.
#[derive(Debug)]
pub struct ChildGuard {
    pid: Pid,
    reaped: bool,
}

impl ChildGuard {
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        let child = command.spawn()?;
        Ok(Self {
            pid: Pid::from_raw(child.id() as i32),
            reaped: false,
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn kill(&self) {
        match signal::kill(self.pid, Signal::SIGKILL) {
            Ok(()) => tracing::debug!(pid = %self.pid, "sent SIGKILL"),
            // Already gone.
            Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pid = %self.pid, "failed to kill child: {e}"),
        }
    }

    /// Blocks until the child has exited and collects its status.
    pub fn reap(&mut self) -> nix::Result<WaitStatus> {
        let status = wait::waitpid(self.pid, None);
        self.reaped = true;
        status
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        self.kill();
        match wait::waitpid(self.pid, None) {
            Ok(status) => tracing::debug!(pid = %self.pid, ?status, "reaped abandoned child"),
            Err(e) => tracing::warn!(pid = %self.pid, "failed to reap child: {e}"),
        }
    }
}
