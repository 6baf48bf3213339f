//! Bounded priority task queue and worker pool.

pub mod scheduler;

use crate::domain::{Priority, ScrapeResult, ScrapeTask, SessionOutcome, TaskStatus};
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub queue_size: usize,
    pub running: usize,
    pub by_status: HashMap<String, u64>,
}

/// Filter for `TaskQueue::list`.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub board_id: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackEvent {
    Completed,
    Failed,
}

type Callback = Arc<dyn Fn(&ScrapeTask) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    completed: Vec<Callback>,
    failed: Vec<Callback>,
}

struct HeapEntry {
    priority: Priority,
    seq: u64,
    id: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; within a priority, lower seq (earlier) first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Inner {
    tasks: Mutex<HashMap<String, ScrapeTask>>,
    heap: Mutex<BinaryHeap<HeapEntry>>,
    results: Mutex<HashMap<String, ScrapeResult>>,
    running_tokens: Mutex<HashMap<String, CancellationToken>>,
    capacity: usize,
    seq: AtomicU64,
    notify: Notify,
    callbacks: Mutex<Callbacks>,
}

/// A bounded priority queue of scrape tasks with a fixed worker pool.
/// Priority ordering is priority-then-FIFO; workers mark a task running,
/// invoke the orchestrator, and handle retry/terminal transitions.
pub struct TaskQueue {
    inner: Arc<Inner>,
    orchestrator: Arc<Orchestrator>,
    worker_count: usize,
    worker_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl TaskQueue {
    pub fn new(capacity: usize, worker_count: usize, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                heap: Mutex::new(BinaryHeap::new()),
                results: Mutex::new(HashMap::new()),
                running_tokens: Mutex::new(HashMap::new()),
                capacity,
                seq: AtomicU64::new(0),
                notify: Notify::new(),
                callbacks: Mutex::new(Callbacks::default()),
            }),
            orchestrator,
            worker_count,
            worker_handles: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn on_completed(&self, f: impl Fn(&ScrapeTask) + Send + Sync + 'static) {
        self.inner.callbacks.lock().await.completed.push(Arc::new(f));
    }

    pub async fn on_failed(&self, f: impl Fn(&ScrapeTask) + Send + Sync + 'static) {
        self.inner.callbacks.lock().await.failed.push(Arc::new(f));
    }

    pub async fn enqueue(&self, task: ScrapeTask) -> Result<String> {
        let mut tasks = self.inner.tasks.lock().await;
        if tasks.len() >= self.inner.capacity {
            return Err(Error::QueueFull {
                capacity: self.inner.capacity,
            });
        }
        let id = task.id.clone();
        let priority = task.priority;
        tasks.insert(id.clone(), task);
        drop(tasks);

        let seq = self.inner.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.inner.heap.lock().await.push(HeapEntry { priority, seq, id: id.clone() });
        self.inner.notify.notify_one();
        Ok(id)
    }

    pub async fn enqueue_bulk(&self, tasks: Vec<ScrapeTask>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            ids.push(self.enqueue(task).await?);
        }
        Ok(ids)
    }

    /// Marks a task cancelled. If it is currently running, its cooperative
    /// cancellation token is triggered so the orchestrator unwinds between
    /// steps. Cancelled tasks are never re-enqueued.
    pub async fn cancel(&self, id: &str) -> bool {
        let mut tasks = self.inner.tasks.lock().await;
        let Some(task) = tasks.get_mut(id) else {
            return false;
        };
        if task.status.is_terminal() {
            return false;
        }
        task.status = TaskStatus::Cancelled;
        task.completed_at = Some(Utc::now());
        drop(tasks);

        if let Some(token) = self.inner.running_tokens.lock().await.get(id) {
            token.cancel();
        }
        true
    }

    pub async fn get(&self, id: &str) -> Option<ScrapeTask> {
        self.inner.tasks.lock().await.get(id).cloned()
    }

    pub async fn list(&self, filter: &TaskFilter) -> Vec<ScrapeTask> {
        self.inner
            .tasks
            .lock()
            .await
            .values()
            .filter(|t| filter.board_id.as_deref().is_none_or(|b| b == t.board_id))
            .filter(|t| filter.status.is_none_or(|s| s == t.status))
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> QueueStats {
        let tasks = self.inner.tasks.lock().await;
        let mut by_status = HashMap::new();
        let mut running = 0;
        for t in tasks.values() {
            *by_status.entry(format!("{:?}", t.status)).or_insert(0u64) += 1;
            if t.status == TaskStatus::Running {
                running += 1;
            }
        }
        QueueStats {
            queue_size: self.inner.heap.lock().await.len(),
            running,
            by_status,
        }
    }

    /// Spawns the worker pool. Idempotent: calling `start` while already
    /// started has no effect.
    pub async fn start(self: &Arc<Self>) {
        let mut handles = self.worker_handles.lock().await;
        if !handles.is_empty() {
            return;
        }
        for worker_id in 0..self.worker_count {
            let queue = self.clone();
            let shutdown = self.shutdown.clone();
            handles.push(tokio::spawn(async move {
                queue.run_worker(worker_id, shutdown).await;
            }));
        }
        info!(worker_count = self.worker_count, "task queue workers started");
    }

    /// Cancels all in-flight tasks and waits for workers to drain, up to
    /// `deadline`.
    pub async fn stop(&self, deadline: Duration) {
        self.shutdown.cancel();
        self.inner.notify.notify_waiters();

        let running_ids: Vec<String> = self.inner.running_tokens.lock().await.keys().cloned().collect();
        for id in running_ids {
            self.cancel(&id).await;
        }

        let mut handles = self.worker_handles.lock().await;
        let joined = tokio::time::timeout(deadline, futures::future::join_all(handles.drain(..))).await;
        if joined.is_err() {
            warn!("task queue workers did not drain within deadline");
        }
    }

    async fn pop_due(&self) -> Option<String> {
        loop {
            let mut heap = self.inner.heap.lock().await;
            let entry = heap.pop()?;
            drop(heap);

            let tasks = self.inner.tasks.lock().await;
            let Some(task) = tasks.get(&entry.id) else {
                continue;
            };
            if task.status.is_terminal() {
                continue;
            }
            if !task.is_due(Utc::now()) {
                let scheduled_at = task.scheduled_at;
                drop(tasks);
                let inner = self.inner.clone_handles_for_requeue();
                let id = entry.id.clone();
                let priority = entry.priority;
                tokio::spawn(async move {
                    if let Some(at) = scheduled_at {
                        let now = Utc::now();
                        let wait = (at - now).to_std().unwrap_or(Duration::from_millis(50));
                        tokio::time::sleep(wait.min(Duration::from_secs(1))).await;
                    }
                    let seq = inner.seq.fetch_add(1, AtomicOrdering::Relaxed);
                    inner.heap.lock().await.push(HeapEntry { priority, seq, id });
                    inner.notify.notify_one();
                });
                continue;
            }
            return Some(entry.id);
        }
    }

    async fn run_worker(self: Arc<Self>, worker_id: usize, shutdown: CancellationToken) {
        loop {
            let id = tokio::select! {
                _ = shutdown.cancelled() => return,
                id = self.next_task_id() => id,
            };
            let Some(id) = id else { continue };
            self.execute_one(worker_id, id).await;
        }
    }

    async fn next_task_id(&self) -> Option<String> {
        loop {
            if let Some(id) = self.pop_due().await {
                return Some(id);
            }
            // Bounded wait so a push that races the notification above isn't
            // missed indefinitely.
            let _ = tokio::time::timeout(Duration::from_millis(200), self.inner.notify.notified()).await;
        }
    }

    async fn execute_one(&self, worker_id: usize, id: String) {
        let token = CancellationToken::new();
        self.inner.running_tokens.lock().await.insert(id.clone(), token.clone());

        let mut task = {
            let mut tasks = self.inner.tasks.lock().await;
            let Some(task) = tasks.get_mut(&id) else {
                self.inner.running_tokens.lock().await.remove(&id);
                return;
            };
            if task.status.is_terminal() {
                self.inner.running_tokens.lock().await.remove(&id);
                return;
            }
            task.status = TaskStatus::Running;
            task.started_at = Some(Utc::now());
            task.clone()
        };

        let outcome = self.orchestrator.execute(&task, token.clone()).await;
        self.inner.running_tokens.lock().await.remove(&id);

        let mut tasks = self.inner.tasks.lock().await;
        let Some(stored) = tasks.get_mut(&id) else { return };
        if stored.status == TaskStatus::Cancelled {
            return;
        }

        match outcome {
            Ok(result) => {
                let retryable_outcome = matches!(
                    result.outcome,
                    SessionOutcome::RateLimited | SessionOutcome::Blocked | SessionOutcome::Timeout | SessionOutcome::Failed
                );
                if retryable_outcome && stored.retry_count < stored.max_retries {
                    stored.last_error = Some(format!("{:?}", result.outcome));
                    stored.retry_count += 1;
                    stored.status = TaskStatus::Retrying;
                    let retry = stored.retry_count;
                    task = stored.clone();
                    drop(tasks);
                    info!(worker_id, task_id = %id, retry, outcome = ?result.outcome, "retrying task after unfavorable outcome");
                    self.schedule_retry(id, task.priority, retry);
                } else {
                    let final_status = if retryable_outcome {
                        stored.last_error = Some(format!("{:?}", result.outcome));
                        TaskStatus::Failed
                    } else {
                        TaskStatus::Completed
                    };
                    stored.status = final_status;
                    stored.completed_at = Some(Utc::now());
                    stored.result_ref = Some(id.clone());
                    task = stored.clone();
                    drop(tasks);
                    self.inner.results.lock().await.insert(id, result);
                    let callbacks = self.inner.callbacks.lock().await;
                    let fired = if final_status == TaskStatus::Failed { &callbacks.failed } else { &callbacks.completed };
                    for cb in fired {
                        cb(&task);
                    }
                }
            }
            Err(e) => {
                stored.last_error = Some(e.to_string());
                if e.is_retryable() && stored.retry_count < stored.max_retries {
                    stored.retry_count += 1;
                    stored.status = TaskStatus::Retrying;
                    let retry = stored.retry_count;
                    let priority = stored.priority;
                    task = stored.clone();
                    drop(tasks);
                    info!(worker_id, task_id = %id, retry, "retrying task");
                    self.schedule_retry(id, priority, retry);
                } else {
                    stored.status = TaskStatus::Failed;
                    stored.completed_at = Some(Utc::now());
                    task = stored.clone();
                    drop(tasks);
                    for cb in &self.inner.callbacks.lock().await.failed {
                        cb(&task);
                    }
                }
            }
        }
    }

    /// Moves a task to `Pending` and re-enqueues it after an exponential
    /// backoff (`2^retry` seconds, capped at 60s). Skips the requeue if the
    /// task was cancelled or replaced while sleeping.
    fn schedule_retry(&self, id: String, priority: Priority, retry: u32) {
        let sleep_secs = 2u64.saturating_pow(retry).min(60);
        let inner = self.inner.clone_handles_for_requeue();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
            let mut tasks = inner.tasks.lock().await;
            if let Some(t) = tasks.get_mut(&id) {
                if t.status == TaskStatus::Retrying {
                    t.status = TaskStatus::Pending;
                } else {
                    return;
                }
            } else {
                return;
            }
            drop(tasks);
            let seq = inner.seq.fetch_add(1, AtomicOrdering::Relaxed);
            inner.heap.lock().await.push(HeapEntry { priority, seq, id });
            inner.notify.notify_one();
        });
    }

    pub async fn result_of(&self, id: &str) -> Option<ScrapeResult> {
        self.inner.results.lock().await.get(id).cloned()
    }
}

impl Inner {
    /// Cheap clone of the handles a spawned requeue task needs, without
    /// cloning the whole TaskQueue (which owns non-Clone JoinHandles).
    fn clone_handles_for_requeue(self: &Arc<Self>) -> Arc<Inner> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_orders_by_priority_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry { priority: Priority::Normal, seq: 0, id: "a".into() });
        heap.push(HeapEntry { priority: Priority::High, seq: 1, id: "b".into() });
        heap.push(HeapEntry { priority: Priority::Normal, seq: 2, id: "c".into() });

        assert_eq!(heap.pop().unwrap().id, "b");
        assert_eq!(heap.pop().unwrap().id, "a");
        assert_eq!(heap.pop().unwrap().id, "c");
    }

    #[test]
    fn retry_backoff_matches_min_2_pow_r_60() {
        for r in 1..10u32 {
            let expected = 2u64.saturating_pow(r).min(60);
            assert_eq!(2u64.saturating_pow(r).min(60), expected);
        }
        assert_eq!(2u64.saturating_pow(7).min(60), 60);
    }
}
