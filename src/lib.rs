//! # Taskdag
//!
//! A single-node, dependency-aware task orchestrator.
//!
//! Taskdag accepts work items with directed dependencies, persists them in a
//! durable SQLite store, and executes them under a fixed concurrency bound.
//!
//! - **Acyclic by construction** - submissions are validated against the
//!   stored graph; cycles and dangling dependencies are rejected up front
//! - **No lost tasks** - every record is durable before the submission is
//!   acknowledged, and tasks found running after a crash are requeued
//! - **No double execution** - every status change goes through one
//!   version-gated update, so concurrent claimants are linearized per task
//! - **Bounded concurrency** - at most `max_concurrent` tasks run at once,
//!   selected FIFO by submission time
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskdag::{SchedulerBuilder, SleepRunner, SqliteTaskStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteTaskStore::connect("tasks.db").await?);
//! store.run_migrations().await?;
//! taskdag::recover_interrupted(store.as_ref()).await?;
//!
//! let scheduler = Arc::new(
//!     SchedulerBuilder::new(store.clone(), SleepRunner)
//!         .max_concurrent(3)
//!         .build(),
//! );
//! scheduler.clone().start();
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod recovery;
pub mod runner;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod task;
pub mod validator;

pub use config::{Config, LogLevel};
pub use error::{StoreError, ValidationError};
pub use recovery::{recover_interrupted, INTERRUPTED_ERROR};
pub use runner::{RunOutcome, SleepRunner, TaskRunner};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use server::{create_router, AppState};
pub use store::{
    InsertOutcome, SqliteTaskStore, StatusCounts, StatusPatch, TaskStore, UpdateOutcome,
};
pub use task::{SubmitTask, Task, TaskStatus};
pub use validator::{materialize, validate, GraphSnapshot};
