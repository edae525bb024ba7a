//! Bounded-concurrency dispatcher.
//!
//! Callers hand over an argument and an async work function; the dispatcher
//! starts it right away when a slot is free, otherwise parks it in a FIFO
//! until a running job finishes. Every submission gets back a [`Completion`]
//! that resolves exactly once with the work function's outcome.
//!
//! Admission runs on every submit and on every completion. The pending list,
//! the active count and the decision to start a job all sit behind one mutex;
//! work functions always run outside it.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::jobs::{Completion, Job, JobId, QueueStatus};

/// Shared handle to the download queue. Cloning is cheap and every clone
/// drives the same pending list and slot count.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
}

struct State {
    pending: VecDeque<Job>,
    active: usize,
    capacity: usize,
}

impl State {
    fn snapshot(&self) -> QueueStatus {
        QueueStatus {
            waiting: self.pending.len(),
            active: self.active,
            capacity: self.capacity,
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher that runs at most `capacity` jobs at once.
    /// A capacity of zero would never admit anything and is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            warn!("queue: capacity of 0 requested, using 1");
            1
        } else {
            capacity
        };

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    pending: VecDeque::new(),
                    active: 0,
                    capacity,
                }),
            }),
        }
    }

    /// Queue `work(argument)` and return a future for its outcome.
    ///
    /// Never blocks. The work function is invoked at most once, when a slot
    /// becomes available; among jobs waiting at the same time the earliest
    /// submitted one is always started first. Must be called from within a
    /// Tokio runtime.
    pub fn submit<A, F, Fut, T, E>(&self, argument: A, work: F) -> Completion<T, E>
    where
        A: Send + 'static,
        F: FnOnce(A) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (job, completion) = Job::new(argument, work);
        let id = job.id;

        {
            let mut state = self.inner.lock();
            state.pending.push_back(job);
            info!(
                job_id = %id,
                waiting = state.pending.len(),
                active = state.active,
                "queue: added job"
            );
        }

        self.inner.admit();
        completion
    }

    /// Current counters. Observability only; may be stale by the time the
    /// caller looks at it.
    pub fn status(&self) -> QueueStatus {
        self.inner.lock().snapshot()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("status", &self.status())
            .finish()
    }
}

impl Inner {
    // Nothing user-supplied runs under this lock, so a poisoned guard still
    // holds consistent counters.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start pending jobs until the queue is empty or every slot is taken.
    fn admit(self: &Arc<Self>) {
        loop {
            let job = {
                let mut state = self.lock();
                if state.active >= state.capacity {
                    return;
                }
                let Some(job) = state.pending.pop_front() else {
                    return;
                };
                state.active += 1;
                assert!(
                    state.active <= state.capacity,
                    "queue invariant violated: {} active with capacity {}",
                    state.active,
                    state.capacity
                );
                info!(
                    job_id = %job.id,
                    active = state.active,
                    capacity = state.capacity,
                    "queue: processing job"
                );
                job
            };

            self.spawn(job);
        }
    }

    fn spawn(self: &Arc<Self>, job: Job) {
        let inner = Arc::clone(self);
        let id = job.id;

        tokio::spawn(async move {
            let settle = job.run().await;
            inner.release(id);
            settle();
            inner.admit();
        });
    }

    fn release(&self, id: JobId) {
        let mut state = self.lock();
        assert!(state.active > 0, "queue invariant violated: released an idle slot");
        state.active -= 1;
        info!(
            job_id = %id,
            active = state.active,
            capacity = state.capacity,
            waiting = state.pending.len(),
            "queue: finished job"
        );
        if state.pending.is_empty() && state.active == 0 {
            debug!("queue: idle");
        }
    }
}
