use std::io;

/// Read-only view of a running process's CPU accounting.
#[mockall::automock]
pub trait ProcessProbe {
    /// User plus system CPU time in milliseconds.
    fn cpu_time_ms(&self) -> io::Result<u64>;

    /// Monotonic counter that only grows while the process is on a CPU.
    fn cpu_progress(&self) -> io::Result<u64>;
}
