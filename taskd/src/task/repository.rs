//! In-memory task repository with snapshot persistence.
//!
//! All state sits behind a single reader/writer lock. Mutations hold the
//! write lock until their snapshot write has finished, so the file on disk
//! always matches some state the repository actually passed through.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};

use super::snapshot::{Snapshot, SnapshotFile};
use super::types::{Durability, Task, TaskId};
use super::TaskError;

#[derive(Debug, Default)]
struct RepositoryState {
    sequence: u64,
    items: HashMap<TaskId, Task>,
}

impl RepositoryState {
    fn to_snapshot(&self) -> Snapshot {
        let mut items: Vec<Task> = self.items.values().cloned().collect();
        items.sort_by_key(|t| t.id);
        Snapshot {
            sequence: self.sequence,
            items,
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            sequence: snapshot.sequence,
            items: snapshot.items.into_iter().map(|t| (t.id, t)).collect(),
        }
    }
}

/// Authoritative store of tasks.
///
/// Construct once, optionally [`load`](Self::load) from disk, then share
/// behind an `Arc`. Every call blocks; async callers should go through
/// `spawn_blocking`.
#[derive(Debug, Default)]
pub struct TaskRepository {
    state: RwLock<RepositoryState>,
    snapshot: Option<SnapshotFile>,
    durability: Durability,
}

impl TaskRepository {
    /// Create an empty repository that keeps state only in memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist snapshots to `path` after every mutation.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(SnapshotFile::new(path));
        self
    }

    /// Set how snapshot write failures are reported.
    #[must_use]
    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Snapshot file, if persistence is enabled.
    #[must_use]
    pub fn snapshot_file(&self) -> Option<&SnapshotFile> {
        self.snapshot.as_ref()
    }

    /// Replace the in-memory state with the snapshot on disk.
    ///
    /// Without a snapshot file this does nothing. A missing file resets the
    /// repository to empty.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::CorruptState`] if the file is unreadable or not a
    /// valid snapshot. The current state is left untouched in that case.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<(), TaskError> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };

        let snapshot = file
            .read()
            .map_err(TaskError::CorruptState)?
            .unwrap_or_default();

        info!(
            path = %file.path().display(),
            sequence = snapshot.sequence,
            tasks = snapshot.items.len(),
            "Loaded task snapshot"
        );

        let loaded = RepositoryState::from_snapshot(snapshot);
        record_size(loaded.items.len());
        *self.state.write() = loaded;
        Ok(())
    }

    /// All tasks, in no particular order.
    #[must_use]
    pub fn list(&self) -> Vec<Task> {
        self.state.read().items.values().cloned().collect()
    }

    /// Get a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if no such task exists.
    pub fn get(&self, id: TaskId) -> Result<Task, TaskError> {
        self.state
            .read()
            .items
            .get(&id)
            .cloned()
            .ok_or(TaskError::NotFound(id))
    }

    /// Last assigned id, or zero if nothing was ever created.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.state.read().sequence
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    /// Whether the repository holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a task with the next id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::EmptyTitle`] for an empty title,
    /// [`TaskError::SequenceExhausted`] once no id is left, and
    /// [`TaskError::Persist`] if the snapshot write fails under
    /// [`Durability::Strict`].
    #[instrument(skip(self))]
    pub fn create(&self, title: &str) -> Result<Task, TaskError> {
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }

        let mut state = self.state.write();
        let next = state
            .sequence
            .checked_add(1)
            .ok_or(TaskError::SequenceExhausted(state.sequence))?;
        let id = TaskId::new(next)?;
        state.sequence = next;
        let now = Utc::now();
        let task = Task {
            id,
            title: title.to_string(),
            done: false,
            created_at: now,
            updated_at: now,
        };

        state.items.insert(id, task.clone());

        metrics::counter!("taskd_tasks_created_total").increment(1);
        record_size(state.items.len());
        debug!(%id, "Created task");

        self.persist_locked(&state)?;
        Ok(task)
    }

    /// Replace a task's title and completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task does not exist, then
    /// [`TaskError::EmptyTitle`] for an empty title, and
    /// [`TaskError::Persist`] on snapshot failure under strict durability.
    #[instrument(skip(self))]
    pub fn update(&self, id: TaskId, title: &str, done: bool) -> Result<Task, TaskError> {
        let mut state = self.state.write();
        let task = state.items.get_mut(&id).ok_or(TaskError::NotFound(id))?;
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        task.title = title.to_string();
        task.done = done;
        // Wall clock can step backwards; updated_at must not.
        task.updated_at = Utc::now().max(task.updated_at);
        let updated = task.clone();

        metrics::counter!("taskd_tasks_updated_total").increment(1);
        debug!(%id, done, "Updated task");

        self.persist_locked(&state)?;
        Ok(updated)
    }

    /// Remove a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task does not exist and
    /// [`TaskError::Persist`] on snapshot failure under strict durability.
    #[instrument(skip(self))]
    pub fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        let mut state = self.state.write();
        if state.items.remove(&id).is_none() {
            return Err(TaskError::NotFound(id));
        }

        metrics::counter!("taskd_tasks_deleted_total").increment(1);
        record_size(state.items.len());
        debug!(%id, "Deleted task");

        self.persist_locked(&state)
    }

    /// Write the snapshot while the caller holds the write lock.
    fn persist_locked(&self, state: &RepositoryState) -> Result<(), TaskError> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };

        match file.write(&state.to_snapshot()) {
            Ok(()) => {
                metrics::counter!("taskd_snapshot_writes_total").increment(1);
                Ok(())
            }
            Err(e) => {
                metrics::counter!("taskd_snapshot_write_failures_total").increment(1);
                error!(
                    path = %file.path().display(),
                    error = %e,
                    durability = ?self.durability,
                    "Failed to persist task snapshot"
                );
                match self.durability {
                    Durability::BestEffort => Ok(()),
                    Durability::Strict => Err(TaskError::Persist(e)),
                }
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_size(len: usize) {
    metrics::gauge!("taskd_tasks").set(len as f64);
}
