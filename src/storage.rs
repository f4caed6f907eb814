use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::RawRow;

/// Opaque marker of the persisted state a snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(u64);

impl Revision {
    fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Revision(hasher.finish())
    }
}

/// All persisted rows plus the revision they were read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rows: Vec<RawRow>,
    pub revision: Revision,
}

/// Backing store for tasks.
///
/// `save` replaces the whole data set, but only if nothing was written since
/// the snapshot identified by `expected` was loaded. Callers pass back the rows
/// they loaded untouched, so appending never rewrites existing records.
pub trait TaskStore {
    /// Loads every persisted row in storage order.
    fn load(&self) -> Result<Snapshot, StorageError>;

    /// Overwrites the store with `rows` and returns the new revision.
    ///
    /// Fails with [`StorageError::Conflict`] if the store moved past `expected`.
    fn save(&self, rows: &[RawRow], expected: Revision) -> Result<Revision, StorageError>;
}

/// Tasks kept as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads the raw file. A missing file reads as empty.
    fn read_bytes(&self) -> Result<Vec<u8>, StorageError> {
        let mut f = match OpenOptions::new().read(true).open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        let mut bytes = Vec::new();
        f.read_to_end(&mut bytes).map_err(|e| self.io_error(e))?;
        Ok(bytes)
    }
}

impl TaskStore for JsonFileStore {
    fn load(&self) -> Result<Snapshot, StorageError> {
        let bytes = self.read_bytes()?;
        let revision = Revision::of(&bytes);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot {
                rows: Vec::new(),
                revision,
            });
        }
        let values: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Decode {
                path: self.path.clone(),
                source,
            })?;
        let rows: Vec<RawRow> = values.into_iter().map(into_row).collect();
        debug!(path = %self.path.display(), rows = rows.len(), "loaded task store");
        Ok(Snapshot { rows, revision })
    }

    fn save(&self, rows: &[RawRow], expected: Revision) -> Result<Revision, StorageError> {
        if Revision::of(&self.read_bytes()?) != expected {
            warn!(path = %self.path.display(), "task store changed since it was loaded, refusing to overwrite");
            return Err(StorageError::Conflict {
                location: self.path.display().to_string(),
            });
        }

        let body = serde_json::to_vec_pretty(rows)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        f.write_all(&body).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), rows = rows.len(), "saved task store");
        Ok(Revision::of(&body))
    }
}

/// Anything that is not an object is a blank row as far as reconciliation goes.
fn into_row(value: Value) -> RawRow {
    match value {
        Value::Object(map) => map,
        _ => RawRow::new(),
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<(Vec<RawRow>, u64)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw rows, malformed ones included.
    pub fn with_rows(rows: Vec<RawRow>) -> Self {
        Self {
            state: RefCell::new((rows, 0)),
        }
    }

    /// The rows currently persisted.
    pub fn rows(&self) -> Vec<RawRow> {
        self.state.borrow().0.clone()
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Result<Snapshot, StorageError> {
        let state = self.state.borrow();
        Ok(Snapshot {
            rows: state.0.clone(),
            revision: Revision(state.1),
        })
    }

    fn save(&self, rows: &[RawRow], expected: Revision) -> Result<Revision, StorageError> {
        let mut state = self.state.borrow_mut();
        if Revision(state.1) != expected {
            return Err(StorageError::Conflict {
                location: "memory".into(),
            });
        }
        state.0 = rows.to_vec();
        state.1 += 1;
        Ok(Revision(state.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use chrono::NaiveDate;
    use serde_json::json;

    fn task(name: &str) -> RawRow {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Task {
            scheduler_name: None,
            scheduler_email: None,
            task_name: name.into(),
            start_date: Some(start),
            duration_days: 7,
            expiry_date: NaiveDate::from_ymd_opt(2024, 1, 8),
            prompt_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            expired: Some(true),
        }
        .to_row()
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("tasks.json"));
        let snapshot = store.load().unwrap();
        assert!(snapshot.rows.is_empty());
        // Saving creates the parent directory.
        store.save(&[task("a")], snapshot.revision).unwrap();
        assert_eq!(store.load().unwrap().rows.len(), 1);
    }

    #[test]
    fn file_round_trip_writes_schema_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = JsonFileStore::new(&path);
        let rev = store.load().unwrap().revision;
        let new_rev = store.save(&[task("a"), task("b")], rev).unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.revision, new_rev);
        assert_eq!(snapshot.rows[1]["task_name"], "b");
        assert_eq!(snapshot.rows[0]["expiry_date"], "2024-01-08");
        assert_eq!(snapshot.rows[0]["expired"], "");

        let text = fs::read_to_string(&path).unwrap();
        let first = text.find("scheduler_name").unwrap();
        let last = text.find("expired").unwrap();
        assert!(first < last);
    }

    #[test]
    fn non_object_rows_load_as_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"[null, "junk", {"task_name": "x"}]"#).unwrap();
        let rows = JsonFileStore::new(&path).load().unwrap().rows;
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert!(rows[1].is_empty());
        assert_eq!(rows[2]["task_name"], json!("x"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
    }

    #[test]
    fn stale_revision_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tasks.json"));
        let first = store.load().unwrap();
        let second = store.load().unwrap();

        store.save(&[task("first writer")], first.revision).unwrap();
        let err = store
            .save(&[task("second writer")], second.revision)
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert_eq!(store.load().unwrap().rows[0]["task_name"], "first writer");
    }

    #[test]
    fn memory_store_detects_conflicts() {
        let store = MemoryStore::new();
        let a = store.load().unwrap();
        let b = store.load().unwrap();
        store.save(&[task("a")], a.revision).unwrap();
        assert!(matches!(
            store.save(&[task("b")], b.revision),
            Err(StorageError::Conflict { .. })
        ));
        assert_eq!(store.rows().len(), 1);
    }
}
