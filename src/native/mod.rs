/// Native module runs the program under test directly on the host,
/// talking to the kernel through pipes, signals and procfs instead of
/// any container runtime.
pub mod child;
pub mod harness;
pub mod monitor;
pub mod procfs;
