//! Serial task execution.
//!
//! - [`queue`]: the unbounded FIFO, its single [`Worker`] and the [`ProcessTask`] seam
//! - [`processor`]: the per-task pipeline behind that seam

mod processor;
mod queue;

pub use processor::{ProcessError, TaskOutcome, TaskProcessor};
pub use queue::{ProcessTask, QueueError, TaskQueue, TaskReceiver, Worker, WorkerStats};
