//! FIFO work queue shared by the workers of a run.
//!
//! The queue tracks which nodes are in flight so that a node never has two
//! jobs running at once, and it knows when a run is drained: no queued jobs
//! and nothing in flight that could still enqueue a continuation.

use pagetree_core::{Job, NodeId};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify};
use tracing::trace;

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    in_flight: HashSet<NodeId>,
}

/// Job queue with in-flight tracking.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    stopped: AtomicBool,
}

impl WorkQueue {
    /// Creates a queue holding `jobs` in order.
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: jobs.into_iter().collect(),
                in_flight: HashSet::new(),
            }),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Takes the next job whose node is not already in flight.
    ///
    /// Waits while other workers may still enqueue continuations. Returns
    /// `None` once the queue is drained or stopped.
    pub async fn pop(&self) -> Option<Job> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if self.is_stopped() {
                    return None;
                }

                let ready = state
                    .jobs
                    .iter()
                    .position(|job| !state.in_flight.contains(&job.node_id));
                if let Some(index) = ready {
                    if let Some(job) = state.jobs.remove(index) {
                        state.in_flight.insert(job.node_id);
                        trace!(node_id = job.node_id, page = job.page, "Job taken");
                        return Some(job);
                    }
                }

                if state.jobs.is_empty() && state.in_flight.is_empty() {
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks the job for `node_id` as done.
    ///
    /// A continuation job goes to the front of the queue, so a node's pages
    /// are fetched back to back when workers are scarce.
    pub async fn finish(&self, node_id: NodeId, next: Option<Job>) {
        {
            let mut state = self.state.lock().await;
            state.in_flight.remove(&node_id);
            if let Some(job) = next {
                state.jobs.push_front(job);
            }
        }
        self.notify.notify_waiters();
    }

    /// Stops handing out jobs. Jobs already taken run to completion.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Returns true once [`stop`](Self::stop) was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Returns the number of queued jobs.
    pub async fn len(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    /// Returns true if no jobs are queued.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
