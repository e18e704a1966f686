// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task queue (C3): priority-ordered, bounded-concurrency dispatch of
//! tasks to the pipeline driver, with terminal-record persistence.

use fleetops_core::{Task, TaskId, TaskPriority};
use fleetops_storage::TaskStore;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::pipeline::PipelineDriver;

/// How long the dispatch loop sleeps when there is nothing to do, between
/// reap-and-capacity-check passes.
const IDLE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1000);

/// A heap entry ordered by `(priority, submission sequence)` only — the
/// task id rides along but never participates in comparison, so `TaskId`
/// doesn't need to implement `Ord`.
struct QueueEntry {
    priority: TaskPriority,
    seq: u64,
    id: TaskId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

struct Inner {
    tasks: Mutex<HashMap<TaskId, Arc<Mutex<Task>>>>,
    heap: Mutex<BinaryHeap<Reverse<QueueEntry>>>,
    seq: AtomicU64,
    active: Mutex<HashMap<TaskId, JoinHandle<()>>>,
    cancelled: Mutex<HashSet<TaskId>>,
    max_concurrent: usize,
    store: Arc<TaskStore>,
    driver: Arc<PipelineDriver>,
    running: AtomicBool,
}

#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
    dispatch_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TaskQueue {
    pub fn new(driver: Arc<PipelineDriver>, store: Arc<TaskStore>, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                heap: Mutex::new(BinaryHeap::new()),
                seq: AtomicU64::new(0),
                active: Mutex::new(HashMap::new()),
                cancelled: Mutex::new(HashSet::new()),
                max_concurrent,
                store,
                driver,
                running: AtomicBool::new(false),
            }),
            dispatch_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Accept a task for execution. Returns immediately; the task runs
    /// once capacity and priority ordering allow.
    pub async fn submit(&self, task: Task) -> TaskId {
        let id = task.id.clone();
        let priority = task.priority;
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        self.inner
            .tasks
            .lock()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(task)));
        self.inner.heap.lock().await.push(Reverse(QueueEntry {
            priority,
            seq,
            id: id.clone(),
        }));
        id
    }

    /// Cancel a task. Returns `false` if the id is unknown or the task is
    /// already in a terminal state (cancellation is a transition, not an
    /// idempotent query).
    pub async fn cancel(&self, id: &TaskId) -> bool {
        let is_active = self.inner.active.lock().await.get(id).is_some();

        let tasks = self.inner.tasks.lock().await;
        let Some(task_arc) = tasks.get(id).cloned() else {
            return false;
        };
        drop(tasks);

        let mut task = task_arc.lock().await;
        if task.status.is_terminal() {
            return false;
        }
        task.mark_cancelled(&fleetops_core::SystemClock);
        drop(task);

        if is_active {
            if let Some(handle) = self.inner.active.lock().await.get(id) {
                handle.abort();
            }
        }
        self.inner.cancelled.lock().await.insert(id.clone());
        true
    }

    /// Snapshot of a task's current state, whether in-flight or already
    /// persisted to terminal history.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        if let Some(task_arc) = self.inner.tasks.lock().await.get(id) {
            return Some(task_arc.lock().await.clone());
        }
        self.inner.store.list().into_iter().find(|t| &t.id == id)
    }

    /// All tasks currently pending or running (terminal tasks live only
    /// in the store once reaped).
    pub async fn list_active(&self) -> Vec<Task> {
        let mut out = Vec::new();
        for task_arc in self.inner.tasks.lock().await.values() {
            out.push(task_arc.lock().await.clone());
        }
        out
    }

    /// Start the dispatch loop as a background task.
    pub fn start(&self) {
        self.inner.running.store(true, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(dispatch_loop(inner));
        let dispatch_handle = Arc::clone(&self.dispatch_handle);
        tokio::spawn(async move {
            *dispatch_handle.lock().await = Some(handle);
        });
    }

    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.dispatch_handle.lock().await.take() {
            handle.abort();
        }
        for handle in self.inner.active.lock().await.values() {
            handle.abort();
        }
    }
}

async fn dispatch_loop(inner: Arc<Inner>) {
    loop {
        if !inner.running.load(Ordering::SeqCst) {
            return;
        }

        reap_finished(&inner).await;

        let capacity_free = inner.active.lock().await.len() < inner.max_concurrent;
        if !capacity_free {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        }

        match pop_next_dispatchable(&inner).await {
            Some((id, task_arc)) => {
                let driver = Arc::clone(&inner.driver);
                let task_clone = Arc::clone(&task_arc);
                let handle = tokio::spawn(async move {
                    driver.execute(task_clone).await;
                });
                inner.active.lock().await.insert(id, handle);
            }
            None => {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reap_finished(inner: &Inner) {
    let finished_ids: Vec<TaskId> = {
        let active = inner.active.lock().await;
        active
            .iter()
            .filter(|(_, h)| h.is_finished())
            .map(|(id, _)| id.clone())
            .collect()
    };
    if finished_ids.is_empty() {
        return;
    }
    let mut active = inner.active.lock().await;
    for id in &finished_ids {
        active.remove(id);
    }
    drop(active);

    for id in finished_ids {
        let task_arc = inner.tasks.lock().await.remove(&id);
        if let Some(task_arc) = task_arc {
            let snapshot = task_arc.lock().await.clone();
            if let Err(e) = inner.store.append(snapshot) {
                tracing::warn!(task_id = %id, error = %e, "failed to persist terminal task record");
            }
        }
    }
}

async fn pop_next_dispatchable(inner: &Inner) -> Option<(TaskId, Arc<Mutex<Task>>)> {
    loop {
        let popped = inner.heap.lock().await.pop();
        let Reverse(entry) = popped?;
        let id = entry.id;

        if inner.cancelled.lock().await.remove(&id) {
            // Already cancelled while pending; drop it and persist its
            // terminal record, mirroring reap_finished.
            let task_arc = inner.tasks.lock().await.remove(&id);
            if let Some(task_arc) = task_arc {
                let snapshot = task_arc.lock().await.clone();
                if let Err(e) = inner.store.append(snapshot) {
                    tracing::warn!(task_id = %id, error = %e, "failed to persist cancelled task record");
                }
            }
            continue;
        }

        let task_arc = inner.tasks.lock().await.get(&id).cloned();
        if let Some(task_arc) = task_arc {
            return Some((id, task_arc));
        }
        // Task was removed (e.g. already reaped); keep looking.
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
