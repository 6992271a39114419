//! Domain types for task records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::TaskError;

/// Task identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a task ID from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidId`] if the value is zero.
    pub fn new(id: u64) -> Result<Self, TaskError> {
        if id == 0 {
            return Err(TaskError::InvalidId(id.to_string()));
        }
        Ok(Self(id))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .parse::<u64>()
            .map_err(|_| TaskError::InvalidId(s.to_string()))?;
        Self::new(raw)
    }
}

/// A tracked task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Repository-assigned identifier.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Completion flag.
    pub done: bool,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update; never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
}

/// How the repository treats a failed snapshot write after a mutation.
///
/// In both modes the in-memory mutation stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Log and count the failure; the mutation call still succeeds.
    #[default]
    BestEffort,
    /// Report the failure to the caller as [`TaskError::Persist`].
    Strict,
}
