use std::io::{self, PipeReader, Read};
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

nix::ioctl_read_bad!(fionread, nix::libc::FIONREAD, nix::libc::c_int);

/// Bytes the child has written so far, plus the pipe they come from.
#[derive(Debug, Default)]
pub struct CapturedOutput {
    buffer: Vec<u8>,
    pipe: Option<PipeReader>,
}

pub type SharedOutput = Arc<RwLock<CapturedOutput>>;

impl CapturedOutput {
    pub fn attach(&mut self, pipe: PipeReader) {
        self.buffer.clear();
        self.pipe = Some(pipe);
    }

    /// Closes the pipe and hands over everything captured.
    pub fn detach(&mut self) -> Vec<u8> {
        self.pipe = None;
        std::mem::take(&mut self.buffer)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Number of bytes that can be read without blocking.
    fn pending(&self) -> io::Result<usize> {
        let Some(pipe) = &self.pipe else {
            return Ok(0);
        };
        let mut available: nix::libc::c_int = 0;
        // SAFETY: the descriptor is owned by `pipe` for the whole call and
        // `available` is a valid c_int to write into.
        unsafe { fionread(pipe.as_raw_fd(), &mut available) }?;
        Ok(available.max(0) as usize)
    }

    fn drain(&mut self, len: usize) -> io::Result<usize> {
        let Some(pipe) = self.pipe.as_mut() else {
            return Ok(0);
        };
        let start = self.buffer.len();
        self.buffer.resize(start + len, 0);
        match pipe.read(&mut self.buffer[start..]) {
            Ok(read) => {
                self.buffer.truncate(start + read);
                Ok(read)
            }
            Err(e) => {
                self.buffer.truncate(start);
                Err(e)
            }
        }
    }
}

/// Peeks under the shared lock and only takes the exclusive lock when there
/// is something to read, so inspectors are never held up by an idle pipe.
async fn drain_once(output: &SharedOutput) -> io::Result<usize> {
    let pending = output.read().await.pending()?;
    if pending == 0 {
        return Ok(0);
    }
    output.write().await.drain(pending)
}

/// Background task moving bytes from the output pipe into [`CapturedOutput`].
#[derive(Debug)]
pub struct OutputMonitor {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl OutputMonitor {
    #[tracing::instrument(skip(output))]
    pub fn start(output: SharedOutput, poll_interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = drain_once(&output).await {
                            tracing::warn!("output pipe read failed: {e}");
                            break;
                        }
                    }
                    _ = &mut stop_rx => {
                        // Pipe contents can outlive the process that wrote them.
                        match drain_once(&output).await {
                            Ok(read) => tracing::debug!(read, "final drain"),
                            Err(e) => tracing::warn!("final drain failed: {e}"),
                        }
                        break;
                    }
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    /// Stops polling after one last drain and waits for the task to end.
    pub async fn finish(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("output monitor task failed: {e}");
        }
    }
}
