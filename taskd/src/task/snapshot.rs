//! Snapshot persistence for the task repository.
//!
//! The whole repository state is written as one JSON document. Writes go to
//! a temporary file in the same directory which is flushed and then renamed
//! over the snapshot, so a reader never observes a half-written file.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::types::Task;

/// Errors reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Content is not valid snapshot JSON.
    #[error("malformed snapshot: {0}")]
    Format(#[from] serde_json::Error),
    /// JSON parsed but violates repository invariants.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

/// Serialized repository state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Last assigned id.
    #[serde(rename = "seq")]
    pub sequence: u64,
    /// All tasks, in no particular order.
    pub items: Vec<Task>,
}

impl Snapshot {
    /// Check that ids are unique and never exceed the sequence, and that
    /// titles and timestamps are sane.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Inconsistent`] describing the first violation.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for task in &self.items {
            if task.id.get() > self.sequence {
                return Err(SnapshotError::Inconsistent(format!(
                    "task {} exceeds sequence {}",
                    task.id, self.sequence
                )));
            }
            if !seen.insert(task.id) {
                return Err(SnapshotError::Inconsistent(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
            if task.title.is_empty() {
                return Err(SnapshotError::Inconsistent(format!(
                    "task {} has an empty title",
                    task.id
                )));
            }
            if task.updated_at < task.created_at {
                return Err(SnapshotError::Inconsistent(format!(
                    "task {} was updated before it was created",
                    task.id
                )));
            }
        }
        Ok(())
    }
}

/// Location of a snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Create a handle for the snapshot at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used for the in-progress write.
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read and validate the snapshot. A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`Snapshot::validate`].
    pub fn read(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        snapshot.validate()?;
        Ok(Some(snapshot))
    }

    /// Atomically replace the snapshot on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, the temporary write, or the
    /// rename fails. The previous snapshot stays in place on failure.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let temp_path = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let result = self.write_and_rename(&temp_path, &json);
        if result.is_err() {
            // The original error matters more than a failed cleanup.
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn write_and_rename(&self, temp_path: &Path, json: &[u8]) -> Result<(), SnapshotError> {
        let io_err = |source: io::Error| SnapshotError::Io {
            path: temp_path.to_path_buf(),
            source,
        };
        let mut file = fs::File::create(temp_path).map_err(io_err)?;
        file.write_all(json).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(temp_path, &self.path).map_err(|source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::TaskId;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn task(id: u64, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId::new(id).unwrap(),
            title: title.to_string(),
            done: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("tasks.json"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn write_replaces_file_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("tasks.json"));
        let snapshot = Snapshot {
            sequence: 2,
            items: vec![task(1, "one"), task(2, "two")],
        };

        file.write(&snapshot).unwrap();
        file.write(&Snapshot {
            sequence: 2,
            items: vec![task(2, "two")],
        })
        .unwrap();

        assert!(!file.temp_path().exists());
        let loaded = file.read().unwrap().unwrap();
        assert_eq!(loaded.sequence, 2);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].title, "two");
    }

    #[test]
    fn write_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested/state/tasks.json"));
        file.write(&Snapshot::default()).unwrap();
        assert!(file.path().exists());
    }

    #[test]
    fn on_disk_format_uses_seq_and_items_keys() {
        let dir = tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("tasks.json"));
        file.write(&Snapshot {
            sequence: 1,
            items: vec![task(1, "one")],
        })
        .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(file.path()).unwrap()).unwrap();
        assert_eq!(raw["seq"], 1);
        assert_eq!(raw["items"][0]["title"], "one");
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), "x").unwrap();

        let file = SnapshotFile::new(&path);
        assert!(matches!(
            file.write(&Snapshot::default()),
            Err(SnapshotError::Io { .. })
        ));
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let file = SnapshotFile::new("/var/lib/taskd/tasks.json");
        assert_eq!(
            file.temp_path(),
            PathBuf::from("/var/lib/taskd/tasks.json.tmp")
        );
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{not json").unwrap();

        let err = SnapshotFile::new(&path).read().unwrap_err();
        assert!(matches!(err, SnapshotError::Format(_)));
    }

    #[test]
    fn validate_rejects_ids_beyond_sequence() {
        let snapshot = Snapshot {
            sequence: 1,
            items: vec![task(1, "one"), task(5, "five")],
        };
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let snapshot = Snapshot {
            sequence: 3,
            items: vec![task(2, "a"), task(2, "b")],
        };
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn validate_rejects_time_travel() {
        let mut broken = task(1, "one");
        broken.updated_at = broken.created_at - Duration::seconds(1);
        let snapshot = Snapshot {
            sequence: 1,
            items: vec![broken],
        };
        assert!(snapshot.validate().is_err());
    }
}
