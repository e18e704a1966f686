// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warm pool manager (C2): keeps a small number of sandboxes pre-created
//! and pre-warmed so `claim` is fast on the common path, with a
//! synchronous on-demand fallback when the pool runs dry.

use fleetops_adapters::SandboxBackend;
use fleetops_core::{Sandbox, SandboxBackendKind, SandboxId, TaskId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::EngineError;

/// Number of samples kept in the rolling claim-latency window.
const LATENCY_WINDOW: usize = 100;

/// Cadence of the background refill loop.
const REFILL_INTERVAL: Duration = Duration::from_secs(2);

struct PoolState {
    /// Sandboxes in `Ready` state, FIFO order.
    ready: VecDeque<Sandbox>,
    /// Sandboxes currently bound to a task.
    claimed: HashMap<TaskId, Sandbox>,
    /// Every sandbox id the pool has created and not yet destroyed.
    /// Shrinks monotonically: an id is removed exactly once, in `release`.
    all_ids: HashSet<SandboxId>,
    claim_latencies_ms: VecDeque<f64>,
    /// Sandboxes in flight through create+warm, not yet in `ready`.
    creating: usize,
    /// Cumulative create/warm failures since the pool started.
    error_count: usize,
}

impl PoolState {
    fn total(&self) -> usize {
        self.all_ids.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WarmPoolStats {
    pub total: usize,
    pub ready: usize,
    pub claimed: usize,
    pub creating: usize,
    pub error: usize,
    pub backend: SandboxBackendKind,
    pub target_size: usize,
    pub mean_claim_latency_ms: f64,
}

pub struct WarmPoolManager {
    backend: Arc<dyn SandboxBackend>,
    state: Mutex<PoolState>,
    spec: fleetops_adapters::sandbox::SandboxSpec,
    target_size: usize,
    refill_threshold: usize,
    filling: AtomicBool,
    running: Arc<AtomicBool>,
    refill_handle: Mutex<Option<JoinHandle<()>>>,
}

impl WarmPoolManager {
    pub fn new(
        backend: Arc<dyn SandboxBackend>,
        spec: fleetops_adapters::sandbox::SandboxSpec,
        target_size: usize,
        refill_threshold: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            state: Mutex::new(PoolState {
                ready: VecDeque::new(),
                claimed: HashMap::new(),
                all_ids: HashSet::new(),
                claim_latencies_ms: VecDeque::new(),
                creating: 0,
                error_count: 0,
            }),
            spec,
            target_size,
            refill_threshold,
            filling: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            refill_handle: Mutex::new(None),
        })
    }

    /// Fill the pool to its target size and start the background refill
    /// loop. Individual creation failures are logged, not fatal.
    pub async fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        self.fill_to_target().await;

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(REFILL_INTERVAL);
            while this.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !this.running.load(Ordering::SeqCst) {
                    break;
                }
                let below_threshold = {
                    let state = this.state.lock().await;
                    state.ready.len() < this.refill_threshold
                };
                if below_threshold {
                    this.fill_to_target().await;
                }
            }
        });
        *self.refill_handle.lock().await = Some(handle);
    }

    /// Stop the refill loop and destroy every sandbox the pool owns,
    /// ready or claimed.
    pub async fn stop(self: &Arc<Self>) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.refill_handle.lock().await.take() {
            handle.abort();
        }

        let (to_destroy, ) = {
            let mut state = self.state.lock().await;
            let mut all: Vec<Sandbox> = state.ready.drain(..).collect();
            all.extend(state.claimed.drain().map(|(_, sbx)| sbx));
            (all,)
        };
        for sandbox in to_destroy {
            if let Err(e) = self.backend.destroy(&sandbox).await {
                tracing::warn!(sandbox = %sandbox.id, error = %e, "failed to destroy sandbox during pool shutdown");
            }
            self.state.lock().await.all_ids.remove(&sandbox.id);
        }
    }

    async fn create_and_warm_one(&self) -> Result<Sandbox, EngineError> {
        self.state.lock().await.creating += 1;
        let result = async {
            let mut sandbox = self
                .backend
                .create(&self.spec)
                .await
                .map_err(EngineError::Adapter)?;
            self.backend
                .warm(&mut sandbox)
                .await
                .map_err(EngineError::Adapter)?;
            Ok(sandbox)
        }
        .await;

        let mut state = self.state.lock().await;
        state.creating = state.creating.saturating_sub(1);
        if result.is_err() {
            state.error_count += 1;
        }
        result
    }

    async fn fill_to_target(&self) {
        if self
            .filling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let needed = {
            let state = self.state.lock().await;
            self.target_size.saturating_sub(state.total())
        };

        if needed > 0 {
            self.state.lock().await.creating += needed;

            let handles: Vec<_> = (0..needed)
                .map(|_| {
                    let backend = Arc::clone(&self.backend);
                    let spec = self.spec.clone();
                    tokio::spawn(async move {
                        let mut sandbox = backend.create(&spec).await.map_err(EngineError::Adapter)?;
                        backend.warm(&mut sandbox).await.map_err(EngineError::Adapter)?;
                        Ok::<Sandbox, EngineError>(sandbox)
                    })
                })
                .collect();

            let mut state = self.state.lock().await;
            for handle in handles {
                state.creating = state.creating.saturating_sub(1);
                match handle.await {
                    Ok(Ok(sandbox)) => {
                        state.all_ids.insert(sandbox.id.clone());
                        state.ready.push_back(sandbox);
                    }
                    Ok(Err(e)) => {
                        state.error_count += 1;
                        tracing::warn!(error = %e, "failed to create/warm sandbox while refilling pool");
                    }
                    Err(e) => {
                        state.error_count += 1;
                        tracing::warn!(error = %e, "sandbox creation task panicked while refilling pool");
                    }
                }
            }
        }

        self.filling.store(false, Ordering::SeqCst);
    }

    /// Claim a ready sandbox for `task_id`. Pops the FIFO head; if the
    /// pool is empty, synchronously creates one on the critical path
    /// (logged as the emergency path).
    pub async fn claim(&self, task_id: TaskId) -> Result<Sandbox, EngineError> {
        let started = Instant::now();

        let popped = {
            let mut state = self.state.lock().await;
            state.ready.pop_front()
        };

        let mut sandbox = match popped {
            Some(sandbox) => sandbox,
            None => {
                tracing::warn!(task_id = %task_id, "warm pool empty, creating sandbox on critical path");
                self.create_and_warm_one().await?
            }
        };

        sandbox.claim(task_id.clone(), &fleetops_core::SystemClock);

        {
            let mut state = self.state.lock().await;
            state.all_ids.insert(sandbox.id.clone());
            state.claimed.insert(task_id, sandbox.clone());
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            state.claim_latencies_ms.push_back(elapsed_ms);
            if state.claim_latencies_ms.len() > LATENCY_WINDOW {
                state.claim_latencies_ms.pop_front();
            }
        }

        Ok(sandbox)
    }

    /// Release the sandbox bound to `task_id`, if any, destroying it.
    /// Idempotent: releasing an unbound or already-released task id is a
    /// no-op.
    pub async fn release(&self, task_id: &TaskId) {
        let sandbox = {
            let mut state = self.state.lock().await;
            state.claimed.remove(task_id)
        };
        let Some(mut sandbox) = sandbox else {
            return;
        };

        sandbox.release(&fleetops_core::SystemClock);
        if let Err(e) = self.backend.destroy(&sandbox).await {
            tracing::warn!(sandbox = %sandbox.id, error = %e, "failed to destroy released sandbox");
        }
        self.state.lock().await.all_ids.remove(&sandbox.id);
    }

    pub async fn stats(&self) -> WarmPoolStats {
        let state = self.state.lock().await;
        let mean_claim_latency_ms = if state.claim_latencies_ms.is_empty() {
            0.0
        } else {
            state.claim_latencies_ms.iter().sum::<f64>() / state.claim_latencies_ms.len() as f64
        };
        WarmPoolStats {
            total: state.total(),
            ready: state.ready.len(),
            claimed: state.claimed.len(),
            creating: state.creating,
            error: state.error_count,
            backend: self.backend.kind(),
            target_size: self.target_size,
            mean_claim_latency_ms,
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
