//! Single-lane FIFO work queue.
//!
//! One worker task drains an unbounded channel and awaits each unit to
//! completion before taking the next, so at most one unit runs at a time and
//! units run in submission order. A unit's result (or panic) is delivered
//! only to the caller that enqueued it; the lane keeps going either way.
//!
//! The worker stops once every handle to the queue has been dropped and the
//! remaining units have run.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, oneshot};

type Job = BoxFuture<'static, ()>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Fetch queue is closed")]
    Closed,

    #[error("Queued unit panicked")]
    UnitPanicked,
}

/// Handle to the lane. Clones submit to the same worker.
#[derive(Clone, Debug)]
pub struct SerializedFetchQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl SerializedFetchQueue {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            tracing::debug!("Fetch queue worker stopped");
        });

        Self { tx }
    }

    /// Append `unit` to the lane.
    ///
    /// The position in the lane is taken when this is called, not when the
    /// returned future is first polled. Dropping the returned future does not
    /// remove the unit; it still runs and its result is discarded.
    pub fn enqueue<F, T>(&self, unit: F) -> impl Future<Output = Result<T, QueueError>> + Send
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();

        let job = async move {
            let outcome = AssertUnwindSafe(unit).catch_unwind().await;
            if outcome.is_err() {
                tracing::error!("Queued unit panicked; continuing with next unit");
            }
            // Caller may have stopped waiting.
            let _ = done_tx.send(outcome.map_err(|_| QueueError::UnitPanicked));
        }
        .boxed();

        let submitted = self.tx.send(job).map_err(|_| QueueError::Closed);

        async move {
            submitted?;
            done_rx.await.map_err(|_| QueueError::Closed)?
        }
    }
}

impl Default for SerializedFetchQueue {
    fn default() -> Self {
        Self::new()
    }
}
