use std::fs::File;
use std::io::{self, PipeReader, PipeWriter};
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use nix::sys::wait::{Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};

use crate::config::HarnessConfig;
use crate::constants::WAIT_SLICE_MS;
use crate::core::domain::{RunOutcome, RunRequest, TimeoutReason};
use crate::core::errors::LaunchFailure;
use crate::core::supervisor::{SliceVerdict, Supervisor};
use crate::core::traits::launcher::Launcher;
use crate::core::traits::probe::ProcessProbe;
use crate::native::child::ChildGuard;
use crate::native::monitor::{OutputMonitor, SharedOutput};
use crate::native::procfs::ProcProbe;

/// Runs one executable under the time-limit heuristic, capturing stdout and
/// stderr into a single blob.
///
/// Only one `launch` may be in flight at a time. Separate harnesses share no
/// handles and can run side by side.
#[derive(Debug)]
pub struct Harness {
    executable: PathBuf,
    config: HarnessConfig,
    output: SharedOutput,
    teardown: AtomicBool,
    teardown_event: Notify,
}

enum Finished {
    Exited {
        status: WaitStatus,
        cpu_time_ms: u64,
        wall_time_ms: u64,
    },
    TimedOut(TimeoutReason),
}

enum Stop {
    Exited(Result<nix::Result<WaitStatus>, JoinError>),
    TimedOut(TimeoutReason),
    Teardown,
}

impl Harness {
    pub fn new(executable: impl AsRef<Path>, config: HarnessConfig) -> Self {
        let executable = executable.as_ref();
        // The child runs in its own directory, so a relative path would no
        // longer resolve.
        let executable =
            std::path::absolute(executable).unwrap_or_else(|_| executable.to_path_buf());

        Harness {
            executable,
            config,
            output: SharedOutput::default(),
            teardown: AtomicBool::new(false),
            teardown_event: Notify::new(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Aborts the run in flight and refuses any later launch.
    pub fn shutdown(&self) {
        tracing::info!("harness shutdown requested");
        self.teardown.store(true, Ordering::SeqCst);
        self.teardown_event.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.teardown.load(Ordering::SeqCst)
    }

    /// Output captured so far by the run in flight.
    pub async fn peek_output(&self) -> String {
        self.output.read().await.text()
    }

    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, LaunchFailure> {
        if self.is_shutting_down() {
            return Err(LaunchFailure::ShuttingDown);
        }

        let (stdin_reader, stdin_writer) = io::pipe().map_err(LaunchFailure::InputPipe)?;
        let (output_reader, output_writer) = io::pipe().map_err(LaunchFailure::OutputPipe)?;
        let error_writer = output_writer
            .try_clone()
            .map_err(LaunchFailure::OutputPipe)?;

        self.output.write().await.attach(output_reader);
        let monitor = OutputMonitor::start(self.output.clone(), self.config.poll_interval);

        let finished = self
            .supervise(request, stdin_reader, stdin_writer, output_writer, error_writer)
            .await;

        monitor.finish().await;
        let captured = self.output.write().await.detach();

        let (status, cpu_time_ms, wall_time_ms) = match finished? {
            Finished::TimedOut(reason) => return Ok(RunOutcome::TimedOut { reason }),
            Finished::Exited {
                status,
                cpu_time_ms,
                wall_time_ms,
            } => (status, cpu_time_ms, wall_time_ms),
        };

        match status {
            WaitStatus::Exited(_, 0) => Ok(RunOutcome::Completed {
                captured_output: String::from_utf8_lossy(&captured).into_owned(),
                cpu_time_ms,
                wall_time_ms,
                exit_code: 0,
            }),
            WaitStatus::Exited(_, code) => Err(LaunchFailure::NonZeroExit(code)),
            WaitStatus::Signaled(_, signal, _) => Err(LaunchFailure::Signaled(signal)),
            other => Err(LaunchFailure::UnexpectedStatus(format!("{other:?}"))),
        }
    }

    async fn supervise(
        &self,
        request: &RunRequest,
        stdin_reader: PipeReader,
        stdin_writer: PipeWriter,
        output_writer: PipeWriter,
        error_writer: PipeWriter,
    ) -> Result<Finished, LaunchFailure> {
        let mut command = Command::new(&request.executable);
        command
            .stdin(Stdio::from(stdin_reader))
            .stdout(Stdio::from(output_writer))
            .stderr(Stdio::from(error_writer));
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }
        let spawned = ChildGuard::spawn(&mut command);
        // Closes our copies of the child's pipe ends.
        drop(command);
        let mut child = spawned.map_err(LaunchFailure::Spawn)?;

        let pid = child.pid();
        let started = Instant::now();
        tracing::debug!(%pid, executable = %request.executable.display(), "child spawned");

        let writer = StdinWriter::start(stdin_writer, request.payload(self.config.eof_marker))
            .map_err(LaunchFailure::InputPipe)?;

        let probe = ProcProbe::new(pid);
        let mut supervisor = Supervisor::new(request.effective_limit_ms(), &self.config);
        let mut exit = wait_for_exit(pid);

        let stop = loop {
            if self.is_shutting_down() {
                break Stop::Teardown;
            }
            tokio::select! {
                biased;
                joined = &mut exit => break Stop::Exited(joined),
                _ = self.teardown_event.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(WAIT_SLICE_MS)) => {
                    if let SliceVerdict::Timeout(reason) =
                        supervisor.on_idle_slice(&probe, started.elapsed())
                    {
                        // A zombie shows no progress; the waiter may just not
                        // have reported it yet.
                        if has_exited(pid) {
                            break Stop::Exited((&mut exit).await);
                        }
                        break Stop::TimedOut(reason);
                    }
                }
            }
        };

        if let Stop::Exited(joined) = stop {
            let wall_time_ms = started.elapsed().as_millis() as u64;
            // Zombie accounting stays readable until the reap.
            let cpu_time_ms = match probe.cpu_time_ms() {
                Ok(cpu_time_ms) => cpu_time_ms,
                Err(e) => {
                    tracing::debug!("final cpu time unavailable: {e}");
                    wall_time_ms
                }
            };
            writer.stop().await;
            let reaped = child.reap();

            joined
                .map_err(|e| LaunchFailure::Wait(io::Error::other(e)))?
                .map_err(|e| LaunchFailure::Wait(e.into()))?;
            let status = reaped.map_err(|e| LaunchFailure::Wait(e.into()))?;
            tracing::debug!(?status, cpu_time_ms, wall_time_ms, "child exited");
            return Ok(Finished::Exited {
                status,
                cpu_time_ms,
                wall_time_ms,
            });
        }

        child.kill();
        writer.stop().await;
        if let Err(e) = exit.await {
            tracing::warn!("exit waiter failed: {e}");
        }
        match child.reap() {
            Ok(status) => tracing::debug!(?status, "reaped killed child"),
            Err(e) => tracing::warn!("failed to reap killed child: {e}"),
        }

        match stop {
            Stop::TimedOut(reason) => {
                tracing::info!(%reason, "run timed out");
                Ok(Finished::TimedOut(reason))
            }
            _ => Err(LaunchFailure::ShuttingDown),
        }
    }
}

#[async_trait::async_trait]
impl Launcher for Harness {
    #[tracing::instrument(skip(self, stdin))]
    async fn launch(&self, stdin: &[u8], time_limit_ms: u64) -> RunOutcome {
        let request = RunRequest::new(&self.executable, stdin, time_limit_ms);
        match self.run(&request).await {
            Ok(outcome) => outcome,
            Err(reason) => {
                tracing::info!(%reason, "launch failed");
                RunOutcome::LaunchFailed { reason }
            }
        }
    }
}

/// Waits for the child to exit without reaping it.
fn wait_for_exit(pid: Pid) -> JoinHandle<nix::Result<WaitStatus>> {
    tokio::task::spawn_blocking(move || {
        nix::sys::wait::waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT)
    })
}

/// Whether the child has exited, leaving it unreaped either way.
fn has_exited(pid: Pid) -> bool {
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT | WaitPidFlag::WNOHANG;
    match nix::sys::wait::waitid(Id::Pid(pid), flags) {
        Ok(WaitStatus::StillAlive) => false,
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(%pid, "exit check failed: {e}");
            false
        }
    }
}

/// Feeds the stdin payload on its own task and closes the pipe when done.
struct StdinWriter {
    handle: Option<JoinHandle<()>>,
}

impl StdinWriter {
    fn start(pipe: PipeWriter, payload: Option<Vec<u8>>) -> io::Result<Self> {
        let Some(payload) = payload else {
            return Ok(StdinWriter { handle: None });
        };
        let mut sender = pipe::Sender::from_file(File::from(OwnedFd::from(pipe)))?;

        let handle = tokio::spawn(async move {
            match sender.write_all(&payload).await {
                Ok(()) => tracing::debug!(bytes = payload.len(), "stdin written"),
                // The child may exit without reading its input.
                Err(e) => tracing::debug!("stdin write ended early: {e}"),
            }
        });
        Ok(StdinWriter {
            handle: Some(handle),
        })
    }

    async fn stop(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.abort();
        match handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => tracing::debug!("stdin writer cancelled"),
            Err(e) => tracing::warn!("stdin writer failed: {e}"),
        }
    }
}

impl Drop for StdinWriter {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_has_exited_leaves_child_unreaped() {
        let mut running = ChildGuard::spawn(Command::new("/bin/sh").args(["-c", "exec sleep 30"]))
            .expect("Failed to spawn sh");
        assert!(!has_exited(running.pid()));
        running.kill();
        running.reap().expect("Failed to reap sleep");

        let mut done = ChildGuard::spawn(Command::new("/bin/sh").args(["-c", "exit 5"]))
            .expect("Failed to spawn sh");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !has_exited(done.pid()) {
            assert!(Instant::now() < deadline, "child never exited");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(done.reap(), Ok(WaitStatus::Exited(_, 5))));
    }

    #[tokio::test]
    async fn test_exit_waiter_does_not_reap() {
        let mut child = ChildGuard::spawn(Command::new("/bin/sh").args(["-c", "exit 4"]))
            .expect("Failed to spawn sh");

        let waited = wait_for_exit(child.pid())
            .await
            .expect("Exit waiter panicked")
            .expect("waitid failed");
        assert!(matches!(waited, WaitStatus::Exited(_, 4)));
        assert!(has_exited(child.pid()));
        assert!(matches!(child.reap(), Ok(WaitStatus::Exited(_, 4))));
    }
}
