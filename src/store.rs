//*** START FILE: src/store.rs ***//
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{CoachError, CoachResult};

/// Small string key-value store for the session token and learned maps.
/// Writes are write-through; callers never read back to verify.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CoachResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CoachResult<()>;
    fn remove(&self, key: &str) -> CoachResult<()>;
}

fn lock<T>(m: &Mutex<T>) -> CoachResult<MutexGuard<'_, T>> {
    m.lock().map_err(|_| CoachError::Store("store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoachResult<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoachResult<()> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoachResult<()> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

/// All entries kept in one pretty-printed JSON object on disk. Every change
/// writes a sibling temp file and renames it over the store, so a crash
/// mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store, starting empty if the file doesn't exist yet.
    /// Missing parent directories are created.
    pub fn open(path: &Path) -> CoachResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CoachError::Store(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        let entries = if path.exists() {
            let file = File::open(path).map_err(|e| {
                CoachError::Store(format!("Failed to open store file at {:?}: {}", path, e))
            })?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                CoachError::Store(format!("Failed to deserialize store from {:?}: {}", path, e))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> CoachResult<()> {
        let temp = self.temp_path();
        let file = File::create(&temp).map_err(|e| {
            CoachError::Store(format!("Failed to create store file at {:?}: {}", temp, e))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries).map_err(|e| {
            CoachError::Store(format!("Failed to serialize store to {:?}: {}", temp, e))
        })?;
        let file = writer
            .into_inner()
            .map_err(|e| CoachError::Store(format!("Failed to write store to {:?}: {}", temp, e)))?;
        file.sync_all()
            .map_err(|e| CoachError::Store(format!("Failed to sync store to {:?}: {}", temp, e)))?;
        drop(file);
        fs::rename(&temp, &self.path).map_err(|e| {
            CoachError::Store(format!("Failed to replace store file at {:?}: {}", self.path, e))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> CoachResult<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoachResult<()> {
        let mut entries = lock(&self.entries)?;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> CoachResult<()> {
        let mut entries = lock(&self.entries)?;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

//*** END FILE: src/store.rs ***//
