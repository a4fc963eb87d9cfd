//! Task storage trait and the types of its operation outcomes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::task::{Task, TaskStatus};

/// Outcome of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was persisted.
    Inserted,
    /// A record with this id already exists; nothing was written.
    Exists,
}

/// Outcome of a version-gated status update.
///
/// `Stale` is a normal result, not an error: it means another writer
/// advanced the row first and the caller should skip or re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored version matched; the write was applied and the version
    /// incremented by exactly one.
    Claimed,
    /// Version mismatch (or the row is already terminal); nothing was
    /// written.
    Stale,
}

/// Partial field updates applied together with a status change.
///
/// `started_at` and `error` distinguish "leave unchanged" (`None`) from
/// "overwrite, possibly with NULL" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub started_at: Option<Option<i64>>,
    pub completed_at: Option<i64>,
    pub error: Option<Option<String>>,
    pub retry_count: Option<u32>,
}

impl StatusPatch {
    /// Patch for a claim: record when execution began.
    pub fn started(now_ms: i64) -> Self {
        Self {
            started_at: Some(Some(now_ms)),
            ..Default::default()
        }
    }

    /// Patch for a successful terminal write.
    pub fn finished(now_ms: i64) -> Self {
        Self {
            completed_at: Some(now_ms),
            ..Default::default()
        }
    }

    /// Patch for a failed terminal write.
    pub fn failed(now_ms: i64, error: impl Into<String>) -> Self {
        Self {
            completed_at: Some(now_ms),
            error: Some(Some(error.into())),
            ..Default::default()
        }
    }

    /// Patch for recovery: clear `started_at` and record why the task was
    /// requeued.
    pub fn interrupted(error: impl Into<String>) -> Self {
        Self {
            started_at: Some(None),
            error: Some(Some(error.into())),
            ..Default::default()
        }
    }
}

/// Number of tasks in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub waiting: i64,
    pub queued: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.waiting + self.queued + self.running + self.completed + self.failed
    }
}

/// Trait for durable task storage backends.
///
/// `update_status` is the sole mutation primitive after insert; all
/// concurrent writers are linearized per id through its version gate.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task record with `version = 0`. Rejects id collisions.
    async fn insert(&self, task: &Task) -> Result<InsertOutcome, StoreError>;

    /// Fetch the full record for `id`.
    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Fetch the record together with its current version. Callers must
    /// read this immediately before any `update_status`.
    async fn get_with_version(&self, id: &str) -> Result<Option<(Task, i64)>, StoreError>;

    /// All tasks ordered by `created_at` ascending, id as tiebreaker.
    async fn list_all(&self) -> Result<Vec<Task>, StoreError>;

    /// All tasks in `status`, same ordering as `list_all`.
    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;

    /// Apply `new_status` and `patch` iff the stored version equals
    /// `expected_version` and the row is not already terminal. On success
    /// the version increments by exactly one.
    async fn update_status(
        &self,
        id: &str,
        new_status: TaskStatus,
        expected_version: i64,
        patch: StatusPatch,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Count of tasks per status.
    async fn stats(&self) -> Result<StatusCounts, StoreError>;

    /// Release underlying resources.
    async fn close(&self);
}
