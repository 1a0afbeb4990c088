//! Supervised fixed-interval runner for background generators
//!
//! Each task runs on its own tokio task with its own interval. A tick either
//! completes, is skipped (nothing to do yet), or fails; failures are logged and
//! the loop waits for the next interval, so one bad tick never ends the task
//! and never reaches the other task.

use crate::utils::AppError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Work was done and persisted
    Completed,
    /// Nothing to do yet; retried on the next tick
    Skipped,
}

/// A unit of periodic work that owns its own state
#[async_trait]
pub trait PeriodicTask: Send + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run one tick
    async fn tick(&mut self) -> Result<TickOutcome, AppError>;
}

/// Spawn `task` on the runtime, ticking every `period` until the process exits
/// or the returned handle is aborted
pub fn spawn_periodic<T: PeriodicTask>(task: T, period: Duration) -> JoinHandle<()> {
    tokio::spawn(run_loop(task, period))
}

/// Run `task` forever at a fixed interval. The first tick fires immediately.
#[instrument(skip(task), fields(task = task.name()))]
pub async fn run_loop<T: PeriodicTask>(mut task: T, period: Duration) {
    info!(period_ms = period.as_millis() as u64, "Starting periodic task");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        run_once(&mut task).await;
    }
}

/// Run a single supervised tick, logging its outcome.
/// Returns `None` when the tick failed.
pub async fn run_once<T: PeriodicTask + ?Sized>(task: &mut T) -> Option<TickOutcome> {
    match task.tick().await {
        Ok(outcome) => {
            debug!(task = task.name(), outcome = ?outcome, "Tick finished");
            Some(outcome)
        }
        Err(e) => {
            error!(
                task = task.name(),
                error = %e,
                error_code = e.error_code(),
                persistence = e.is_persistence_failure(),
                "Tick failed, continuing on next interval"
            );
            None
        }
    }
}

/// Run a task for a fixed number of ticks without waiting between them
///
/// Useful for testing
pub async fn run_iterations<T: PeriodicTask + ?Sized>(
    task: &mut T,
    iterations: usize,
) -> Vec<Option<TickOutcome>> {
    let mut outcomes = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        outcomes.push(run_once(task).await);
    }
    outcomes
}
