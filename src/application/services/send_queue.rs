//! Outbound send queue
//!
//! Every send of a session goes through one queue with a single worker
//! task. Tasks run strictly in submission order, one at a time, and the
//! worker waits until at least `min_interval` has passed since the previous
//! task finished before starting the next one. This keeps the bot under the
//! protocol's send rate limit no matter how many commands reply at once.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::application::errors::BotError;

/// Pause between two sends unless configured otherwise.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Resolves to `false` when the job was skipped without running its task
type BoxFuture = Pin<Box<dyn Future<Output = bool> + Send>>;
type Job = Box<dyn FnOnce() -> BoxFuture + Send>;

#[derive(Default)]
struct Pending {
    jobs: VecDeque<Job>,
    closed: bool,
}

struct Inner {
    pending: Mutex<Pending>,
    notify: Notify,
    min_interval: Duration,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Future returned by [`SendQueue::enqueue`]. Resolves with the task's own
/// result, or `BotError::Cancelled` if the task was discarded before it ran.
pub struct QueuedSend<T> {
    rx: oneshot::Receiver<Result<T, BotError>>,
}

impl<T> Future for QueuedSend<T> {
    type Output = Result<T, BotError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(BotError::Cancelled)))
    }
}

pub struct SendQueue {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SendQueue {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn new(min_interval: Duration) -> Self {
        let inner = Arc::new(Inner {
            pending: Mutex::new(Pending::default()),
            notify: Notify::new(),
            min_interval,
        });
        let worker = tokio::spawn(run_worker(inner.clone()));
        Self {
            inner,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Queue a task. Its place in line is fixed when this returns; the task
    /// itself is not called until every earlier task has settled.
    ///
    /// Dropping the returned future withdraws the task: if nobody is waiting
    /// for the result when its turn comes, it is skipped.
    pub fn enqueue<T, F, Fut>(&self, task: F) -> QueuedSend<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BotError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.inner.lock();
        if pending.closed {
            let _ = tx.send(Err(BotError::QueueClosed));
            return QueuedSend { rx };
        }
        pending.jobs.push_back(Box::new(move || {
            Box::pin(async move {
                if tx.is_closed() {
                    return false;
                }
                let _ = tx.send(task().await);
                true
            })
        }));
        drop(pending);
        self.inner.notify.notify_one();
        QueuedSend { rx }
    }

    /// Discard every task that has not started yet. Their futures resolve
    /// with `BotError::Cancelled`; a task already running is unaffected.
    pub fn clear(&self) -> usize {
        let discarded: Vec<Job> = self.inner.lock().jobs.drain(..).collect();
        let count = discarded.len();
        drop(discarded);
        if count > 0 {
            tracing::debug!(count, "cleared pending sends");
        }
        count
    }

    /// Number of tasks waiting for their turn
    pub fn pending(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    /// Stop accepting tasks and cancel the ones still waiting.
    pub fn close(&self) -> usize {
        let discarded: Vec<Job> = {
            let mut pending = self.inner.lock();
            pending.closed = true;
            pending.jobs.drain(..).collect()
        };
        self.inner.notify.notify_one();
        discarded.len()
    }

    /// Close the queue and wait for the in-flight task (if any) to finish.
    pub async fn shutdown(&self) {
        let cancelled = self.close();
        if cancelled > 0 {
            tracing::warn!(cancelled, "send queue closed with pending sends");
        }
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl Drop for SendQueue {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_worker(inner: Arc<Inner>) {
    let mut last_completed: Option<Instant> = None;

    loop {
        // Wait for work. Notify keeps a permit, so a push that lands between
        // the check and the await is not missed.
        loop {
            {
                let pending = inner.lock();
                if pending.closed {
                    return;
                }
                if !pending.jobs.is_empty() {
                    break;
                }
            }
            inner.notify.notified().await;
        }

        if let Some(done) = last_completed {
            let elapsed = done.elapsed();
            if elapsed < inner.min_interval {
                tokio::time::sleep(inner.min_interval - elapsed).await;
            }
        }

        // The queue may have been cleared while we were pacing.
        let Some(job) = inner.lock().jobs.pop_front() else {
            continue;
        };

        // Run on its own task so a panicking send cannot take the worker down.
        match tokio::spawn(job()).await {
            Ok(false) => {
                tracing::debug!("skipped send whose caller went away");
                continue;
            }
            Ok(true) => {}
            Err(e) => tracing::error!("send task aborted: {}", e),
        }
        last_completed = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Arc<Mutex<Vec<(usize, Duration)>>>;

    fn record(log: &Log, index: usize, start: Instant) {
        log.lock().unwrap().push((index, start.elapsed()));
    }

    fn assert_near(actual: Duration, expected_ms: u64) {
        let diff = (actual.as_millis() as i64 - expected_ms as i64).abs();
        assert!(diff <= 50, "expected ~{expected_ms}ms, got {actual:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_in_order_with_pacing() {
        let queue = SendQueue::new(Duration::from_millis(1000));
        let log: Log = Arc::default();
        let start = Instant::now();

        let mut sends = Vec::new();
        for i in 0..3 {
            let log = log.clone();
            sends.push(queue.enqueue(move || async move {
                record(&log, i, start);
                Ok::<_, BotError>(i)
            }));
        }
        for (i, send) in sends.into_iter().enumerate() {
            assert_eq!(send.await.unwrap(), i);
        }

        let log = log.lock().unwrap();
        assert_eq!(log.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_near(log[0].1, 0);
        assert_near(log[1].1, 1000);
        assert_near(log[2].1, 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_task_still_finishes_first() {
        let queue = SendQueue::new(Duration::from_millis(1000));
        let log: Log = Arc::default();
        let start = Instant::now();

        let slow = {
            let log = log.clone();
            queue.enqueue(move || async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                record(&log, 0, start);
                Ok::<_, BotError>(())
            })
        };
        let fast = {
            let log = log.clone();
            queue.enqueue(move || async move {
                record(&log, 1, start);
                Ok::<_, BotError>(())
            })
        };
        let (a, b) = tokio::join!(fast, slow);
        a.unwrap();
        b.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log[0].0, 0);
        assert_eq!(log[1].0, 1);
        // interval is measured from the previous completion
        assert_near(log[1].1, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_task_does_not_poison_the_queue() {
        let queue = SendQueue::new(Duration::from_millis(10));
        let bad = queue.enqueue(|| async { Err::<(), _>(BotError::Transport("socket closed".into())) });
        let good = queue.enqueue(|| async { Ok::<_, BotError>("sent") });

        assert!(matches!(bad.await, Err(BotError::Transport(msg)) if msg == "socket closed"));
        assert_eq!(good.await.unwrap(), "sent");
    }

    #[tokio::test(start_paused = true)]
    async fn a_panicking_task_is_isolated() {
        let queue = SendQueue::new(Duration::ZERO);
        let boom = queue.enqueue(|| async {
            if true {
                panic!("boom");
            }
            Ok::<(), BotError>(())
        });
        let after = queue.enqueue(|| async { Ok::<_, BotError>(7) });

        assert!(boom.await.is_err());
        assert_eq!(after.await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_only_tasks_that_have_not_started() {
        let queue = SendQueue::new(Duration::from_millis(1000));
        let first = queue.enqueue(|| async { Ok::<_, BotError>(1) });
        let second = queue.enqueue(|| async { Ok::<_, BotError>(2) });
        let third = queue.enqueue(|| async { Ok::<_, BotError>(3) });

        assert_eq!(first.await.unwrap(), 1);
        // worker is now pacing before the second task
        assert_eq!(queue.clear(), 2);
        assert!(matches!(second.await, Err(BotError::Cancelled)));
        assert!(matches!(third.await, Err(BotError::Cancelled)));

        // queue keeps working afterwards
        let next = queue.enqueue(|| async { Ok::<_, BotError>(4) });
        assert_eq!(next.await.unwrap(), 4);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_send_is_skipped_without_using_a_slot() {
        let queue = SendQueue::new(Duration::from_millis(1000));
        let log: Log = Arc::default();
        let start = Instant::now();

        let first = queue.enqueue(|| async { Ok::<_, BotError>(()) });
        let abandoned = {
            let log = log.clone();
            queue.enqueue(move || async move {
                record(&log, 1, start);
                Ok::<_, BotError>(())
            })
        };
        let last = {
            let log = log.clone();
            queue.enqueue(move || async move {
                record(&log, 2, start);
                Ok::<_, BotError>(())
            })
        };
        drop(abandoned);

        first.await.unwrap();
        last.await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, 2);
        assert_near(log[0].1, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_rejects_new_tasks() {
        let queue = SendQueue::new(Duration::ZERO);
        queue.shutdown().await;
        let send = queue.enqueue(|| async { Ok::<_, BotError>(()) });
        assert!(matches!(send.await, Err(BotError::QueueClosed)));
    }
}
