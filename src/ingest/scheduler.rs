// src/ingest/scheduler.rs
//! Periodic fetch → merge loop.
//!
//! Idle → Running on spawn, Running → Stopped once cancelled. Cancellation is
//! checked at the top of every iteration and raced against the interval
//! wait; an in-flight fetch is allowed to finish. No cycle outcome ever ends
//! the loop.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::StatsEngine;
use crate::ingest::types::{CycleError, CycleOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    merged: AtomicU64,
    empty_batches: AtomicU64,
    fetch_failures: AtomicU64,
    unexpected_failures: AtomicU64,
}

/// Point-in-time copy of the scheduler's cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub merged: u64,
    pub empty_batches: u64,
    pub fetch_failures: u64,
    pub unexpected_failures: u64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            merged: self.merged.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            unexpected_failures: self.unexpected_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct SharedState(Arc<Mutex<SchedulerState>>);

impl SharedState {
    fn get(&self) -> SchedulerState {
        *self.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set(&self, s: SchedulerState) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = s;
    }
}

pub struct PollingScheduler {
    engine: StatsEngine,
    interval: Duration,
    state: SharedState,
    counters: Arc<Counters>,
}

impl PollingScheduler {
    pub fn new(engine: StatsEngine, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            state: SharedState(Arc::new(Mutex::new(SchedulerState::Idle))),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state.get()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Move to Running on a background task and hand back the controls.
    pub fn spawn(self) -> SchedulerHandle {
        let (tx, rx) = watch::channel(false);
        self.state.set(SchedulerState::Running);
        let state = self.state.clone();
        let counters = self.counters.clone();
        let join = tokio::spawn(self.run(rx));
        SchedulerHandle {
            shutdown: tx,
            join,
            state,
            counters,
        }
    }

    /// Drive cycles until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.state.set(SchedulerState::Running);
        info!(
            target: "scheduler",
            interval_secs = self.interval.as_secs_f64(),
            provider = self.engine.provider_name(),
            "polling scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let _ = self.run_cycle().await;
            if self.wait_or_cancel(&mut shutdown).await {
                break;
            }
        }

        self.state.set(SchedulerState::Stopped);
        info!(target: "scheduler", stats = ?self.counters.snapshot(), "polling scheduler stopped");
    }

    /// One isolated cycle. The work runs on its own task so a panic comes
    /// back as [`CycleError::Unexpected`] instead of unwinding the loop.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        info!(target: "scheduler", at = %Utc::now(), "fetching and processing posts");

        let engine = self.engine.clone();
        let result = match tokio::spawn(async move { engine.trigger_fetch_and_merge().await }).await
        {
            Ok(r) => r,
            Err(join_err) => Err(CycleError::Unexpected(join_error_message(join_err))),
        };

        match &result {
            Ok(CycleOutcome::Merged { .. }) => {
                self.counters.merged.fetch_add(1, Ordering::Relaxed);
                info!(target: "scheduler", "successfully fetched and processed posts");
            }
            Ok(CycleOutcome::EmptyBatch) => {
                self.counters.empty_batches.fetch_add(1, Ordering::Relaxed);
            }
            Err(CycleError::Fetch { .. }) => {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
            }
            Err(e @ CycleError::Unexpected(_)) => {
                self.counters
                    .unexpected_failures
                    .fetch_add(1, Ordering::Relaxed);
                counter!("stats_unexpected_failures_total").increment(1);
                error!(target: "scheduler", error = %e, "ingest cycle aborted");
            }
        }
        result
    }

    /// `true` when cancelled before the interval elapsed.
    async fn wait_or_cancel(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.interval);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return true;
                    }
                }
            }
        }
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Controls for a spawned scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    state: SharedState,
    counters: Arc<Counters>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        self.state.get()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Signal cancellation without waiting.
    pub fn cancel(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Cancel and wait for the loop to exit (after any in-flight fetch).
    pub async fn stop(self) -> SchedulerStats {
        self.cancel();
        if let Err(e) = self.join.await {
            warn!(target: "scheduler", error = %e, "scheduler task ended abnormally");
            self.state.set(SchedulerState::Stopped);
        }
        self.counters.snapshot()
    }
}
