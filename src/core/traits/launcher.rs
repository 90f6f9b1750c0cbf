use crate::core::domain::RunOutcome;

/// Runs the program under test once.
///
/// Implementations are bound to one executable; only one `launch` may be in
/// flight per instance at a time.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Launcher: std::fmt::Debug + Send + Sync {
    async fn launch(&self, stdin: &[u8], time_limit_ms: u64) -> RunOutcome;
}
