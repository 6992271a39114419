//! Storage configuration for taskd.
//!
//! This module defines where the task snapshot lives and how write
//! failures are reported.

use serde::Deserialize;
use std::path::PathBuf;

use crate::task::{Durability, TaskError, TaskRepository};

/// Snapshot storage settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Snapshot file. An empty string keeps state in memory only.
    pub path: String,
    /// Failure policy for snapshot writes.
    #[serde(default)]
    pub durability: Durability,
}

impl StorageSettings {
    /// Snapshot path, or `None` when persistence is disabled.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        let path = self.path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Build the repository these settings describe and load its snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::CorruptState`] if the snapshot cannot be loaded.
    pub fn open_repository(&self) -> Result<TaskRepository, TaskError> {
        let mut repository = TaskRepository::new().with_durability(self.durability);
        if let Some(path) = self.snapshot_path() {
            repository = repository.with_file(path);
        }
        repository.load()?;
        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn settings(path: &str) -> StorageSettings {
        StorageSettings {
            path: path.to_string(),
            durability: Durability::Strict,
        }
    }

    #[test]
    fn blank_path_disables_persistence() {
        assert_eq!(settings("  ").snapshot_path(), None);
        let repository = settings("").open_repository().unwrap();
        assert!(repository.snapshot_file().is_none());
    }

    #[test]
    fn open_repository_loads_existing_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"{"seq": 5, "items": []}"#).unwrap();

        let repository = settings(path.to_str().unwrap()).open_repository().unwrap();
        assert_eq!(repository.sequence(), 5);
        assert_eq!(repository.snapshot_file().unwrap().path(), path.as_path());
    }

    #[test]
    fn open_repository_reports_corrupt_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            settings(path.to_str().unwrap()).open_repository(),
            Err(TaskError::CorruptState(_))
        ));
    }
}
