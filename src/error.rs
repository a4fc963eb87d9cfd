//! Error types shared across the orchestrator.

use thiserror::Error;

/// Fatal storage-layer error.
///
/// The scheduler treats any `StoreError` as cause for shutdown; the HTTP
/// layer surfaces it as a 500.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A rejected submission.
///
/// Each variant corresponds to one validator check; the message is the
/// human-readable reason returned to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("id must be a non-empty string")]
    MissingId,

    #[error("type must be a non-empty string")]
    MissingType,

    #[error("duration_ms must be a non-negative number")]
    NegativeDuration,

    #[error("task already exists: {0}")]
    Duplicate(String),

    #[error("dependency ids must be non-empty strings")]
    EmptyDependency,

    #[error("task cannot depend on itself")]
    SelfDependency,

    #[error("unknown dependency: {0}")]
    UnknownDependency(String),

    #[error("dependency cycle detected through {0}")]
    CycleDetected(String),
}
