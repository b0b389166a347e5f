use std::future::Future;

/// Source of isolated execution contexts for pool tasks
///
/// A context is acquired right before a task starts and released after it
/// finishes, fails, times out or is cancelled. Implementations hand out a
/// cloneable handle: the task gets one clone, the pool keeps one for release.
pub trait ContextProvider: Send + Sync + 'static {
    type Context: Clone + Send + Sync + 'static;

    fn acquire(&self) -> impl Future<Output = anyhow::Result<Self::Context>> + Send;

    fn release(&self, context: Self::Context) -> impl Future<Output = ()> + Send;

    /// Called once by `WorkerPool::shutdown` after the last task finished
    fn shutdown(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
