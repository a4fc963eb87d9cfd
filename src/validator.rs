//! Submission validation and task materialization.
//!
//! Validation is pure with respect to a [`GraphSnapshot`]: the duplicate
//! check, dependency-existence check, cycle check, and the initial-status
//! decision all observe the same snapshot. A dependency completing between
//! snapshot and insert is harmless; the scheduler's readiness check promotes
//! such a task on its next tick.

use std::collections::{HashMap, HashSet};

use crate::error::{StoreError, ValidationError};
use crate::store::TaskStore;
use crate::task::{SubmitTask, Task, TaskStatus};

/// Immutable view of the stored task graph.
pub struct GraphSnapshot {
    tasks: HashMap<String, (TaskStatus, Vec<String>)>,
}

impl GraphSnapshot {
    /// Load a snapshot from the store.
    pub async fn load<S: TaskStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(Self::from_tasks(&store.list_all().await?))
    }

    /// Build a snapshot from task records directly.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let tasks = tasks
            .iter()
            .map(|t| (t.id.clone(), (t.status, t.dependencies.clone())))
            .collect();
        Self { tasks }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.tasks.get(id).map(|(status, _)| *status)
    }

    fn dependencies_of(&self, id: &str) -> &[String] {
        self.tasks
            .get(id)
            .map(|(_, deps)| deps.as_slice())
            .unwrap_or(&[])
    }
}

/// Run all submission checks in order; the first failure wins.
pub fn validate(input: &SubmitTask, snapshot: &GraphSnapshot) -> Result<(), ValidationError> {
    if input.id.is_empty() {
        return Err(ValidationError::MissingId);
    }
    if input.task_type.is_empty() {
        return Err(ValidationError::MissingType);
    }
    if input.duration_ms < 0 {
        return Err(ValidationError::NegativeDuration);
    }
    if snapshot.contains(&input.id) {
        return Err(ValidationError::Duplicate(input.id.clone()));
    }
    if input.dependencies.iter().any(|d| d.is_empty()) {
        return Err(ValidationError::EmptyDependency);
    }
    if input.dependencies.iter().any(|d| d == &input.id) {
        return Err(ValidationError::SelfDependency);
    }
    for dep in &input.dependencies {
        if !snapshot.contains(dep) {
            return Err(ValidationError::UnknownDependency(dep.clone()));
        }
    }
    if let Some(through) = creates_cycle(&input.id, &input.dependencies, snapshot) {
        return Err(ValidationError::CycleDetected(through));
    }
    Ok(())
}

/// Build the task record for a submission that passed [`validate`].
///
/// Initial status is `Queued` when the task has no dependencies or every
/// dependency is already completed, `Waiting` otherwise.
pub fn materialize(input: &SubmitTask, snapshot: &GraphSnapshot, created_at: i64) -> Task {
    let ready = input
        .dependencies
        .iter()
        .all(|dep| snapshot.status_of(dep) == Some(TaskStatus::Completed));

    Task {
        id: input.id.clone(),
        task_type: input.task_type.clone(),
        duration_ms: input.duration_ms.max(0) as u64,
        dependencies: input.dependencies.clone(),
        status: if ready {
            TaskStatus::Queued
        } else {
            TaskStatus::Waiting
        },
        created_at,
        started_at: None,
        completed_at: None,
        error: None,
        retry_count: 0,
        version: 0,
    }
}

/// Would adding the edges `id -> deps` close a cycle?
///
/// Edges in the stored graph run from a task to its dependencies, so the new
/// task closes a cycle exactly when `id` is reachable from one of its
/// dependencies. Depth-first search from each dependency with a shared
/// visited set, early exit on hit. O(V + E).
///
/// Returns the dependency through which the cycle runs.
fn creates_cycle(id: &str, deps: &[String], snapshot: &GraphSnapshot) -> Option<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    for dep in deps {
        let mut stack = vec![dep.as_str()];
        while let Some(node) = stack.pop() {
            if node == id {
                return Some(dep.clone());
            }
            if !visited.insert(node) {
                continue;
            }
            for next in snapshot.dependencies_of(node) {
                stack.push(next);
            }
        }
    }
    None
}
