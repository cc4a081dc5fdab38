//! Snapshot persistence for the client-owned slices.
//!
//! Students and users are written under a single key after every mutation
//! that touches them. Posts are never persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::students::StudentsState;
use super::users::UsersState;

/// Key the snapshot is stored under.
pub const STATE_KEY: &str = "journal_state";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory store. Clones share the same backing map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let map = self
            .inner
            .lock()
            .map_err(|e| PersistError::Unavailable(e.to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|e| PersistError::Unavailable(e.to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The persisted shape. Either slice may be missing in older snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<StudentsState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<UsersState>,
}

/// Read the snapshot. Any failure is logged and treated as "nothing stored".
pub fn load_state(store: &dyn KeyValueStore) -> PersistedState {
    let raw = match store.get(STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return PersistedState::default(),
        Err(e) => {
            tracing::warn!("Failed to read persisted state: {e}");
            return PersistedState::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Ignoring malformed persisted state: {e}");
            PersistedState::default()
        }
    }
}

pub fn save_state(
    store: &mut dyn KeyValueStore,
    students: &StudentsState,
    users: &UsersState,
) -> Result<(), PersistError> {
    #[derive(Serialize)]
    struct Snapshot<'a> {
        students: &'a StudentsState,
        users: &'a UsersState,
    }

    let json = serde_json::to_string(&Snapshot { students, users })?;
    store.set(STATE_KEY, &json)
}
