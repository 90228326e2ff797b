use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Trait for component schedulers that run periodic notification tasks
pub trait Scheduler: Send + Sync + 'static {
    /// Spawn the scheduler's tasks. They run until `cancel` fires.
    fn start(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>>;
}
