//! Job definitions for the download queue.
//!
//! A [`Job`] wraps a caller's work function together with its argument and the
//! sending half of a oneshot channel. The type parameters of the work function
//! are erased here so jobs with different result types can share one queue.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Opaque identifier generated at submission time. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Failure outcome of a submitted job.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E> {
    /// The work function returned an error. Carried verbatim.
    #[error("{0}")]
    Failed(E),

    /// The work function panicked, or its task was torn down before it
    /// produced a result.
    #[error("job {0} aborted before producing a result")]
    Aborted(JobId),
}

impl<E> DispatchError<E> {
    /// The work function's own error, if that is what ended the job.
    pub fn failure(&self) -> Option<&E> {
        match self {
            DispatchError::Failed(err) => Some(err),
            DispatchError::Aborted(_) => None,
        }
    }
}

/// Hands a finished job's outcome to its submitter. Consumed on use, so a
/// completion slot can only ever be resolved once.
pub(crate) type Settle = Box<dyn FnOnce() + Send>;

/// A unit of queued work.
pub(crate) struct Job {
    pub(crate) id: JobId,
    run: Box<dyn FnOnce() -> BoxFuture<'static, Settle> + Send>,
}

impl Job {
    /// Package `work(argument)` as a job. Nothing runs until [`Job::run`].
    pub(crate) fn new<A, F, Fut, T, E>(argument: A, work: F) -> (Self, Completion<T, E>)
    where
        A: Send + 'static,
        F: FnOnce(A) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let id = JobId::new();
        let (tx, rx) = oneshot::channel();

        let run = Box::new(move || -> BoxFuture<'static, Settle> {
            async move {
                let outcome = AssertUnwindSafe(async move { work(argument).await })
                    .catch_unwind()
                    .await;

                let result = match outcome {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(DispatchError::Failed(err)),
                    Err(_) => {
                        tracing::error!(job_id = %id, "queue: work function panicked");
                        Err(DispatchError::Aborted(id))
                    }
                };

                Box::new(move || {
                    if tx.send(result).is_err() {
                        tracing::debug!(job_id = %id, "queue: submitter stopped waiting");
                    }
                }) as Settle
            }
            .boxed()
        });

        (Self { id, run }, Completion { id, rx })
    }

    /// Execute the work function. Consumes the job, so it cannot start twice.
    pub(crate) fn run(self) -> BoxFuture<'static, Settle> {
        (self.run)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Future returned by [`Dispatcher::submit`](super::Dispatcher::submit).
///
/// Resolves exactly once with the work function's outcome. Dropping it does
/// not cancel the job; the work still runs and its result is discarded.
#[derive(Debug)]
pub struct Completion<T, E> {
    id: JobId,
    rx: oneshot::Receiver<Result<T, DispatchError<E>>>,
}

impl<T, E> Completion<T, E> {
    pub fn id(&self) -> JobId {
        self.id
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Result<T, DispatchError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DispatchError::Aborted(id))))
    }
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub waiting: usize,
    pub active: usize,
    pub capacity: usize,
}
