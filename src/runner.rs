//! Task execution contract and the reference runner.

use async_trait::async_trait;
use std::time::Duration;

use crate::task::Task;

/// Terminal outcome reported by a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure(String),
}

/// Executes a claimed task.
///
/// The orchestrator makes no idempotency guarantee on its behalf: a task
/// interrupted by a crash is requeued and will run again, so runners should
/// be written to tolerate re-execution.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &Task) -> RunOutcome;
}

/// Reference runner: sleeps for the task's `duration_ms` and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepRunner;

#[async_trait]
impl TaskRunner for SleepRunner {
    async fn run(&self, task: &Task) -> RunOutcome {
        tokio::time::sleep(Duration::from_millis(task.duration_ms)).await;
        RunOutcome::Success
    }
}
