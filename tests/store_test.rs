//! Tests for SqliteTaskStore.

use sqlx::SqlitePool;
use taskdag::{
    InsertOutcome, SqliteTaskStore, StatusPatch, Task, TaskStatus, TaskStore, UpdateOutcome,
};

async fn setup_store() -> SqliteTaskStore {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    let store = SqliteTaskStore::new(pool);
    store.run_migrations().await.unwrap();
    store
}

fn make_task(id: &str, created_at: i64) -> Task {
    Task {
        id: id.to_string(),
        task_type: "demo".to_string(),
        duration_ms: 50,
        dependencies: vec![],
        status: TaskStatus::Queued,
        created_at,
        started_at: None,
        completed_at: None,
        error: None,
        retry_count: 0,
        version: 0,
    }
}

#[tokio::test]
async fn test_insert_and_get() {
    let store = setup_store().await;

    let mut task = make_task("a", 1000);
    task.dependencies = vec!["x".to_string(), "y".to_string()];
    assert_eq!(store.insert(&task).await.unwrap(), InsertOutcome::Inserted);

    let fetched = store.get("a").await.unwrap().unwrap();
    assert_eq!(fetched, task);

    assert!(store.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_duplicate_returns_exists() {
    let store = setup_store().await;

    let task = make_task("a", 1000);
    store.insert(&task).await.unwrap();

    let mut other = make_task("a", 2000);
    other.task_type = "other".to_string();
    assert_eq!(store.insert(&other).await.unwrap(), InsertOutcome::Exists);

    // The original record is untouched.
    let fetched = store.get("a").await.unwrap().unwrap();
    assert_eq!(fetched.task_type, "demo");
    assert_eq!(fetched.created_at, 1000);
}

#[tokio::test]
async fn test_list_all_orders_by_created_at_then_id() {
    let store = setup_store().await;

    store.insert(&make_task("c", 3000)).await.unwrap();
    store.insert(&make_task("b", 1000)).await.unwrap();
    store.insert(&make_task("a", 1000)).await.unwrap();

    let tasks = store.list_all().await.unwrap();
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_by_status() {
    let store = setup_store().await;

    store.insert(&make_task("a", 1000)).await.unwrap();
    let mut waiting = make_task("b", 2000);
    waiting.status = TaskStatus::Waiting;
    store.insert(&waiting).await.unwrap();

    let queued = store.list_by_status(TaskStatus::Queued).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, "a");

    let running = store.list_by_status(TaskStatus::Running).await.unwrap();
    assert!(running.is_empty());
}

#[tokio::test]
async fn test_update_claims_and_increments_version() {
    let store = setup_store().await;
    store.insert(&make_task("a", 1000)).await.unwrap();

    let outcome = store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5000))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Claimed);

    let task = store.get("a").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Running);
    assert_eq!(task.started_at, Some(5000));
    assert_eq!(task.version, 1);
}

#[tokio::test]
async fn test_update_stale_on_version_mismatch() {
    let store = setup_store().await;
    store.insert(&make_task("a", 1000)).await.unwrap();

    let outcome = store
        .update_status("a", TaskStatus::Running, 7, StatusPatch::started(5000))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Stale);

    let task = store.get("a").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.started_at, None);
    assert_eq!(task.version, 0);
}

#[tokio::test]
async fn test_exactly_one_same_version_update_wins() {
    let store = setup_store().await;
    store.insert(&make_task("a", 1000)).await.unwrap();

    let first = store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5000))
        .await
        .unwrap();
    let second = store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5001))
        .await
        .unwrap();

    assert_eq!(first, UpdateOutcome::Claimed);
    assert_eq!(second, UpdateOutcome::Stale);

    let task = store.get("a").await.unwrap().unwrap();
    assert_eq!(task.started_at, Some(5000));
    assert_eq!(task.version, 1);
}

#[tokio::test]
async fn test_terminal_rows_are_frozen() {
    let store = setup_store().await;
    store.insert(&make_task("a", 1000)).await.unwrap();

    store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5000))
        .await
        .unwrap();
    store
        .update_status("a", TaskStatus::Completed, 1, StatusPatch::finished(6000))
        .await
        .unwrap();

    // Even with the correct version, a completed task accepts no writes.
    let outcome = store
        .update_status("a", TaskStatus::Queued, 2, StatusPatch::default())
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Stale);

    let task = store.get("a").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.version, 2);
}

#[tokio::test]
async fn test_interrupted_patch_clears_started_at() {
    let store = setup_store().await;
    store.insert(&make_task("a", 1000)).await.unwrap();

    store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5000))
        .await
        .unwrap();

    let outcome = store
        .update_status(
            "a",
            TaskStatus::Queued,
            1,
            StatusPatch::interrupted("interrupted"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Claimed);

    let task = store.get("a").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.started_at, None);
    assert_eq!(task.error.as_deref(), Some("interrupted"));
}

#[tokio::test]
async fn test_failed_patch_records_error() {
    let store = setup_store().await;
    store.insert(&make_task("a", 1000)).await.unwrap();

    store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5000))
        .await
        .unwrap();
    store
        .update_status(
            "a",
            TaskStatus::Failed,
            1,
            StatusPatch::failed(6000, "boom"),
        )
        .await
        .unwrap();

    let task = store.get("a").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.completed_at, Some(6000));
    assert_eq!(task.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn test_stats_counts_by_status() {
    let store = setup_store().await;

    store.insert(&make_task("a", 1000)).await.unwrap();
    store.insert(&make_task("b", 2000)).await.unwrap();
    let mut waiting = make_task("c", 3000);
    waiting.status = TaskStatus::Waiting;
    store.insert(&waiting).await.unwrap();

    store
        .update_status("a", TaskStatus::Running, 0, StatusPatch::started(5000))
        .await
        .unwrap();

    let counts = store.stats().await.unwrap();
    assert_eq!(counts.waiting, 1);
    assert_eq!(counts.queued, 1);
    assert_eq!(counts.running, 1);
    assert_eq!(counts.completed, 0);
    assert_eq!(counts.failed, 0);
    assert_eq!(counts.total(), 3);
}
