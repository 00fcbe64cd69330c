//! A one-job-at-a-time worker queue.
//!
//! [`SerialQueue`] runs submitted closures on Tokio's blocking pool, strictly
//! one after another in submission order, without blocking the submitter.
//! Each job carries a [`CancellationToken`]; a job whose token is cancelled
//! before it starts is dropped without running.

use std::any::Any;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use crate::progress::CancellationToken;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueuedJob {
    job: Job,
    cancellation: CancellationToken,
}

/// Serial worker queue backed by a single Tokio task.
///
/// Dropping the queue lets already-submitted jobs finish; the worker task
/// exits once the backlog is drained.
pub(crate) struct SerialQueue {
    label: &'static str,
    sender: UnboundedSender<QueuedJob>,
}

impl SerialQueue {
    /// Start the worker on `runtime`.
    pub(crate) fn new(runtime: &Handle, label: &'static str) -> Self {
        let (sender, mut receiver) = unbounded_channel::<QueuedJob>();

        runtime.spawn(async move {
            while let Some(QueuedJob { job, cancellation }) = receiver.recv().await {
                if cancellation.is_cancelled() {
                    log::trace!("{label}: skipping cancelled job");
                    continue;
                }
                if let Err(error) = tokio::task::spawn_blocking(job).await {
                    log::warn!("{label}: job did not complete: {error}");
                }
            }
            log::trace!("{label}: worker stopped");
        });

        Self { label, sender }
    }

    /// Queue `job`. It runs after every previously queued job, unless
    /// `cancellation` is cancelled first.
    pub(crate) fn submit<F>(&self, cancellation: CancellationToken, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let queued = QueuedJob {
            job: Box::new(job),
            cancellation,
        };
        if self.sender.send(queued).is_err() {
            // The worker only stops when the runtime shuts down; dropping
            // the job drops whatever result channel it owned.
            log::warn!("{}: worker is gone, job dropped", self.label);
        }
    }
}

/// The message a panic was raised with, if it carried one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
