//! SQLite implementation of TaskStore.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::task_store::{InsertOutcome, StatusCounts, StatusPatch, TaskStore, UpdateOutcome};
use crate::error::StoreError;
use crate::task::{Task, TaskStatus};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    task_type TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    dependencies TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER,
    error TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);

CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
"#;

const COLUMNS: &str = "id, task_type, duration_ms, dependencies, status, created_at, \
                       started_at, completed_at, error, retry_count, version";

type TaskRow = (
    String,         // id
    String,         // task_type
    i64,            // duration_ms
    String,         // dependencies (JSON array)
    String,         // status
    i64,            // created_at
    Option<i64>,    // started_at
    Option<i64>,    // completed_at
    Option<String>, // error
    i64,            // retry_count
    i64,            // version
);

/// SQLite-backed task store.
///
/// Writes go through the WAL journal, so a committed update survives an
/// unclean process exit.
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Create a store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a WAL-mode database at `path`.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Run migrations to create the tasks table and its indexes.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn row_to_task(row: TaskRow) -> Result<Task, StoreError> {
        let (id, task_type, duration_ms, deps, status, created_at, started_at, completed_at, error, retry_count, version) =
            row;

        let dependencies: Vec<String> = serde_json::from_str(&deps)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let status = TaskStatus::parse(&status)
            .ok_or_else(|| StoreError::Storage(format!("unknown status in store: {status}")))?;

        Ok(Task {
            id,
            task_type,
            duration_ms: duration_ms as u64,
            dependencies,
            status,
            created_at,
            started_at,
            completed_at,
            error,
            retry_count: retry_count as u32,
            version,
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert(&self, task: &Task) -> Result<InsertOutcome, StoreError> {
        let deps = serde_json::to_string(&task.dependencies)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, task_type, duration_ms, dependencies, status,
                               created_at, started_at, completed_at, error, retry_count, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&task.id)
        .bind(&task.task_type)
        .bind(task.duration_ms as i64)
        .bind(deps)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.started_at)
        .bind(task.completed_at)
        .bind(&task.error)
        .bind(task.retry_count as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Exists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM tasks WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;

        row.map(Self::row_to_task).transpose()
    }

    async fn get_with_version(&self, id: &str) -> Result<Option<(Task, i64)>, StoreError> {
        Ok(self.get(id).await?.map(|task| {
            let version = task.version;
            (task, version)
        }))
    }

    async fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM tasks ORDER BY created_at, id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;

        rows.into_iter().map(Self::row_to_task).collect()
    }

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE status = ? ORDER BY created_at, id"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        rows.into_iter().map(Self::row_to_task).collect()
    }

    async fn update_status(
        &self,
        id: &str,
        new_status: TaskStatus,
        expected_version: i64,
        patch: StatusPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        // Assemble the UPDATE from the patched columns only. The version
        // gate plus the terminal-status guard make this the linearization
        // point for all writers of a row.
        let mut sql = String::from("UPDATE tasks SET status = ?, version = version + 1");
        if patch.started_at.is_some() {
            sql.push_str(", started_at = ?");
        }
        if patch.completed_at.is_some() {
            sql.push_str(", completed_at = ?");
        }
        if patch.error.is_some() {
            sql.push_str(", error = ?");
        }
        if patch.retry_count.is_some() {
            sql.push_str(", retry_count = ?");
        }
        sql.push_str(
            " WHERE id = ? AND version = ? AND status NOT IN ('completed', 'failed')",
        );

        let mut query = sqlx::query(&sql).bind(new_status.as_str());
        if let Some(started_at) = patch.started_at {
            query = query.bind(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            query = query.bind(completed_at);
        }
        if let Some(error) = patch.error {
            query = query.bind(error);
        }
        if let Some(retry_count) = patch.retry_count {
            query = query.bind(retry_count as i64);
        }

        let result = query
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        if result.rows_affected() == 1 {
            Ok(UpdateOutcome::Claimed)
        } else {
            Ok(UpdateOutcome::Stale)
        }
    }

    async fn stats(&self) -> Result<StatusCounts, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match TaskStatus::parse(&status) {
                Some(TaskStatus::Waiting) => counts.waiting = count,
                Some(TaskStatus::Queued) => counts.queued = count,
                Some(TaskStatus::Running) => counts.running = count,
                Some(TaskStatus::Completed) => counts.completed = count,
                Some(TaskStatus::Failed) => counts.failed = count,
                None => return Err(StoreError::Storage(format!("unknown status in store: {status}"))),
            }
        }
        Ok(counts)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
