//! Tests for submission validation and initial-status assignment.

use taskdag::{
    materialize, validate, GraphSnapshot, SubmitTask, Task, TaskStatus, ValidationError,
};

fn stored(id: &str, status: TaskStatus, deps: &[&str]) -> Task {
    Task {
        id: id.to_string(),
        task_type: "demo".to_string(),
        duration_ms: 10,
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        status,
        created_at: 0,
        started_at: None,
        completed_at: None,
        error: None,
        retry_count: 0,
        version: 0,
    }
}

fn submission(id: &str, deps: &[&str]) -> SubmitTask {
    SubmitTask {
        id: id.to_string(),
        task_type: "demo".to_string(),
        duration_ms: 10,
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
    }
}

fn empty_snapshot() -> GraphSnapshot {
    GraphSnapshot::from_tasks(&[])
}

#[test]
fn rejects_empty_id() {
    let input = submission("", &[]);
    assert_eq!(
        validate(&input, &empty_snapshot()),
        Err(ValidationError::MissingId)
    );
}

#[test]
fn rejects_empty_type() {
    let mut input = submission("a", &[]);
    input.task_type = String::new();
    assert_eq!(
        validate(&input, &empty_snapshot()),
        Err(ValidationError::MissingType)
    );
}

#[test]
fn rejects_negative_duration() {
    let mut input = submission("a", &[]);
    input.duration_ms = -1;
    assert_eq!(
        validate(&input, &empty_snapshot()),
        Err(ValidationError::NegativeDuration)
    );
}

#[test]
fn rejects_duplicate_id() {
    let snapshot = GraphSnapshot::from_tasks(&[stored("a", TaskStatus::Queued, &[])]);
    let result = validate(&submission("a", &[]), &snapshot);
    assert_eq!(result, Err(ValidationError::Duplicate("a".to_string())));
}

#[test]
fn rejects_empty_dependency_string() {
    let input = submission("a", &[""]);
    assert_eq!(
        validate(&input, &empty_snapshot()),
        Err(ValidationError::EmptyDependency)
    );
}

#[test]
fn rejects_self_dependency() {
    let input = submission("a", &["a"]);
    assert_eq!(
        validate(&input, &empty_snapshot()),
        Err(ValidationError::SelfDependency)
    );
}

#[test]
fn rejects_unknown_dependency_and_names_it() {
    let snapshot = GraphSnapshot::from_tasks(&[stored("a", TaskStatus::Queued, &[])]);
    let err = validate(&submission("b", &["a", "missing"]), &snapshot).unwrap_err();
    assert_eq!(err, ValidationError::UnknownDependency("missing".to_string()));
    assert!(err.to_string().contains("missing"));
}

#[test]
fn first_failure_wins() {
    // Both the id and the dependency are invalid; the id check runs first.
    let input = submission("", &["missing"]);
    assert_eq!(
        validate(&input, &empty_snapshot()),
        Err(ValidationError::MissingId)
    );
}

#[test]
fn rejects_three_node_cycle() {
    // Stored graph: b -> c -> d, where d is the task being submitted.
    // Submitting d with a dependency on b closes the loop d -> b -> c -> d.
    let snapshot = GraphSnapshot::from_tasks(&[
        stored("b", TaskStatus::Waiting, &["c"]),
        stored("c", TaskStatus::Waiting, &["d"]),
    ]);
    let err = validate(&submission("d", &["b"]), &snapshot).unwrap_err();
    assert_eq!(err, ValidationError::CycleDetected("b".to_string()));
}

#[test]
fn accepts_diamond_graph() {
    let snapshot = GraphSnapshot::from_tasks(&[
        stored("a", TaskStatus::Queued, &[]),
        stored("b", TaskStatus::Waiting, &["a"]),
        stored("c", TaskStatus::Waiting, &["a"]),
    ]);
    assert!(validate(&submission("d", &["b", "c"]), &snapshot).is_ok());
}

#[test]
fn accepts_chain_dependency() {
    let snapshot = GraphSnapshot::from_tasks(&[
        stored("a", TaskStatus::Completed, &[]),
        stored("b", TaskStatus::Queued, &["a"]),
    ]);
    assert!(validate(&submission("c", &["b"]), &snapshot).is_ok());
}

#[test]
fn initial_status_queued_without_dependencies() {
    let task = materialize(&submission("a", &[]), &empty_snapshot(), 1000);
    assert_eq!(task.status, TaskStatus::Queued);
}

#[test]
fn initial_status_queued_when_all_dependencies_completed() {
    let snapshot = GraphSnapshot::from_tasks(&[
        stored("a", TaskStatus::Completed, &[]),
        stored("b", TaskStatus::Completed, &[]),
    ]);
    let task = materialize(&submission("c", &["a", "b"]), &snapshot, 1000);
    assert_eq!(task.status, TaskStatus::Queued);
}

#[test]
fn initial_status_waiting_when_any_dependency_incomplete() {
    let snapshot = GraphSnapshot::from_tasks(&[
        stored("a", TaskStatus::Completed, &[]),
        stored("b", TaskStatus::Running, &[]),
    ]);
    let task = materialize(&submission("c", &["a", "b"]), &snapshot, 1000);
    assert_eq!(task.status, TaskStatus::Waiting);
}

#[test]
fn materialize_preserves_submission_fields() {
    let mut input = submission("a", &["b", "c"]);
    input.task_type = "transcode".to_string();
    input.duration_ms = 250;
    let snapshot = GraphSnapshot::from_tasks(&[
        stored("b", TaskStatus::Queued, &[]),
        stored("c", TaskStatus::Queued, &[]),
    ]);

    let task = materialize(&input, &snapshot, 42_000);
    assert_eq!(task.id, "a");
    assert_eq!(task.task_type, "transcode");
    assert_eq!(task.duration_ms, 250);
    assert_eq!(task.dependencies, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(task.created_at, 42_000);
    assert_eq!(task.started_at, None);
    assert_eq!(task.completed_at, None);
    assert_eq!(task.error, None);
    assert_eq!(task.retry_count, 0);
    assert_eq!(task.version, 0);
}
