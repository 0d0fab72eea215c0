//! Unbounded FIFO task queue with a single consumer.
//!
//! Producers hold cloneable [`TaskQueue`] handles and never block. One
//! [`Worker`] drains the queue, running each task to completion before taking
//! the next: completion order equals submission order and no two tasks
//! overlap. A task that errors or panics is logged and the loop moves on.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::types::TaskRequest;

/// Errors from submitting work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The worker has stopped and will never take another task.
    #[error("task queue is closed")]
    Closed,
}

/// Producer handle for the task queue.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<TaskRequest>,
}

/// Consumer end of the task queue, owned by the [`Worker`].
#[derive(Debug)]
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<TaskRequest>,
}

impl TaskQueue {
    /// Creates a queue and its single receiver.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (TaskQueue, TaskReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TaskQueue { tx }, TaskReceiver { rx })
    }

    /// Appends a task. Never blocks.
    pub fn enqueue(&self, task: TaskRequest) -> Result<(), QueueError> {
        self.tx.send(task).map_err(|_| QueueError::Closed)
    }

    /// Returns true once the receiver is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl TaskReceiver {
    /// Takes the next queued task without waiting.
    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<TaskRequest> {
        self.rx.try_recv().ok()
    }
}

/// Runs one dequeued task.
pub trait ProcessTask: Send + Sync + 'static {
    type Output: Send + 'static;
    type Error: Display + Send + 'static;

    fn process(
        &self,
        task: TaskRequest,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Tasks taken off the queue, including failed ones.
    pub processed: u64,

    /// Tasks that returned an error or panicked.
    pub failed: u64,
}

/// The single consumer of a [`TaskReceiver`].
pub struct Worker<P> {
    receiver: TaskReceiver,
    handler: Arc<P>,
}

impl<P: ProcessTask> Worker<P> {
    pub fn new(receiver: TaskReceiver, handler: Arc<P>) -> Self {
        Self { receiver, handler }
    }

    /// Drains the queue until every [`TaskQueue`] handle is dropped or
    /// `shutdown` is cancelled. Cancellation is only observed between tasks.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) -> WorkerStats {
        info!("Worker started");
        let mut stats = WorkerStats::default();

        loop {
            let task = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping worker");
                    break;
                }

                task = self.receiver.rx.recv() => match task {
                    Some(task) => task,
                    None => {
                        info!("Task queue closed");
                        break;
                    }
                },
            };

            let (name, round, nonce) = (task.task.clone(), task.round, task.nonce.clone());
            debug!(task = %name, round, %nonce, "Dequeued task");

            let handler = Arc::clone(&self.handler);
            let result = tokio::spawn(async move { handler.process(task).await }).await;
            stats.processed += 1;

            match result {
                Ok(Ok(_)) => debug!(task = %name, round, %nonce, "Task finished"),
                Ok(Err(e)) => {
                    stats.failed += 1;
                    error!(task = %name, round, %nonce, error = %e, "Task failed");
                }
                Err(join_error) => {
                    stats.failed += 1;
                    if join_error.is_panic() {
                        error!(task = %name, round, %nonce, "Task panicked");
                    } else {
                        error!(task = %name, round, %nonce, error = %join_error, "Task aborted");
                    }
                }
            }
        }

        info!(processed = stats.processed, failed = stats.failed, "Worker stopped");
        stats
    }
}
