//! Task domain model.

use serde::{Deserialize, Serialize};

/// Execution state of a task.
///
/// `Completed` and `Failed` are terminal: once a task reaches either, no
/// further transitions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// At least one dependency has not completed yet.
    Waiting,
    /// Ready to be claimed by the scheduler.
    Queued,
    /// Claimed and currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl TaskStatus {
    /// Storage/wire form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse the storage/wire form back into a status.
    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "waiting" => Some(TaskStatus::Waiting),
            "queued" => Some(TaskStatus::Queued),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task record as persisted in the store.
///
/// Timestamps are milliseconds since the Unix epoch. `version` increments by
/// exactly one on every committed status update and is the basis of the
/// optimistic-concurrency discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub duration_ms: u64,
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub version: i64,
}

/// A submission as it arrives over the wire, before validation.
///
/// `duration_ms` is signed so that a negative value reaches the validator
/// and produces a proper rejection instead of a deserialization error.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTask {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub duration_ms: i64,
    #[serde(default)]
    pub dependencies: Vec<String>,
}
