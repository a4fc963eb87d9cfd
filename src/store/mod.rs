//! Durable task storage.

mod sqlite_store;
mod task_store;

pub use sqlite_store::SqliteTaskStore;
pub use task_store::{InsertOutcome, StatusCounts, StatusPatch, TaskStore, UpdateOutcome};
