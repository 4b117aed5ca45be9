//! Rate-limited request queue
//!
//! Serializes arbitrary asynchronous operations against one external
//! endpoint so no two calls fire closer together than a configured
//! minimum interval, without blocking the callers' own control flow.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct State {
    pending: VecDeque<Job>,
    draining: bool,
}

/// FIFO dispatcher enforcing a minimum delay between operations.
///
/// Callers hand [`enqueue`](RequestQueue::enqueue) an arbitrary future and
/// get its output back once the queue has drained up to it. Operations run
/// strictly in insertion order, one at a time, with the configured delay
/// slept before each one — including the first of a burst. One operation's
/// failure only fails its own caller; the drain continues with the next
/// item. Depth is unbounded; back-pressure is the caller's concern.
#[derive(Clone)]
pub struct RequestQueue {
    state: Arc<Mutex<State>>,
    delay: Duration,
}

impl RequestQueue {
    /// Create a queue with the given minimum inter-request delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                pending: VecDeque::new(),
                draining: false,
            })),
            delay,
        }
    }

    /// Enqueue an operation and wait for its outcome.
    ///
    /// Only the call that finds the queue idle spawns the drain task; every
    /// other call just appends. Dropping the returned future does not
    /// cancel the operation — it still runs in its queue slot, its outcome
    /// discarded.
    pub async fn enqueue<T, F>(&self, op: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // The receiver is gone if the caller was cancelled; the
            // operation has already run either way.
            let _ = tx.send(op.await);
        });

        let start_drain = {
            let mut state = self.state.lock().await;
            state.pending.push_back(job);
            !std::mem::replace(&mut state.draining, true)
        };
        if start_drain {
            self.spawn_drain();
        }

        rx.await.expect("request queue dropped a pending operation")
    }

    /// Number of operations waiting to run.
    pub async fn depth(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    fn spawn_drain(&self) {
        let state = Arc::clone(&self.state);
        let delay = self.delay;
        tokio::spawn(async move {
            loop {
                let job = {
                    let mut state = state.lock().await;
                    match state.pending.pop_front() {
                        Some(job) => job,
                        None => {
                            state.draining = false;
                            break;
                        }
                    }
                };
                tokio::time::sleep(delay).await;
                job.await;
            }
        });
    }
}
