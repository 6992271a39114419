//! Task domain for taskd.
//!
//! This module owns the task records and the repository that guards them.
//! It has no knowledge of HTTP; the API layer translates [`TaskError`]
//! into responses.

pub mod repository;
pub mod snapshot;
pub mod types;

pub use repository::TaskRepository;
pub use snapshot::{Snapshot, SnapshotError, SnapshotFile};
pub use types::{Durability, Task, TaskId};

/// Task-related errors.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// No task with the given id.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// Title was empty.
    #[error("task title must not be empty")]
    EmptyTitle,
    /// Id was zero or otherwise unusable.
    #[error("invalid task id: {0}")]
    InvalidId(String),
    /// Snapshot file could not be read or did not hold a valid snapshot.
    #[error("corrupt state: {0}")]
    CorruptState(#[source] SnapshotError),
    /// Every id up to `u64::MAX` has been handed out.
    #[error("task id sequence exhausted at {0}")]
    SequenceExhausted(u64),
    /// Snapshot could not be written after a mutation.
    #[error("failed to persist snapshot: {0}")]
    Persist(#[source] SnapshotError),
}
