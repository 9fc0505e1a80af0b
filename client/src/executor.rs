/// A unit of work handed to an `Executor`
pub type Task = Box<dyn FnOnce() + Send>;

/// Runs the continuations of asynchronous chains.
///
/// Transports complete their callbacks on whatever thread they like; the
/// session hands every continuation to its executor before running it. The
/// default runs them inline, which never blocks the calling thread.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Runs every task immediately on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}
