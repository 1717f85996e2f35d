use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{error, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Entry, Schedule, Settings};

pub const KEY_ENTRIES: &str = "bruxisme_entries";
pub const KEY_SETTINGS: &str = "bruxisme_settings";
pub const KEY_SCHEDULE: &str = "bruxisme_schedule";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable, synchronous key-value storage of JSON values.
///
/// `get` never fails: a missing key and an unreadable value both read as `None`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<FileStore, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("store:: failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        parse_soft(key, &content)
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        write_atomic(&self.path_for(key), &bytes)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

fn parse_soft(key: &str, raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("store:: ignoring corrupt value for {}: {}", key, e);
            None
        }
    }
}

fn load_typed<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(e) => {
            warn!("store:: value for {} has an unexpected shape: {}", key, e);
            None
        }
    }
}

fn save_typed<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_value(value)
        .map_err(StoreError::from)
        .and_then(|value| store.set(key, &value));
    if let Err(e) = result {
        error!("store:: failed to save {}: {}", key, e);
    }
}

/// Newest first.
pub fn load_entries(store: &dyn KeyValueStore) -> Vec<Entry> {
    load_typed(store, KEY_ENTRIES).unwrap_or_default()
}

pub fn save_entry(store: &dyn KeyValueStore, entry: &Entry) {
    let mut entries = load_entries(store);
    entries.insert(0, entry.clone());
    save_typed(store, KEY_ENTRIES, &entries);
}

pub fn load_settings(store: &dyn KeyValueStore) -> Settings {
    load_typed(store, KEY_SETTINGS).unwrap_or_default()
}

pub fn save_settings(store: &dyn KeyValueStore, settings: &Settings) {
    save_typed(store, KEY_SETTINGS, settings);
}

pub fn load_schedule(store: &dyn KeyValueStore) -> Option<Schedule> {
    load_typed(store, KEY_SCHEDULE)
}

pub fn save_schedule(store: &dyn KeyValueStore, schedule: &Schedule) {
    save_typed(store, KEY_SCHEDULE, schedule);
}

pub fn remove_schedule(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(KEY_SCHEDULE) {
        error!("store:: failed to remove {}: {}", KEY_SCHEDULE, e);
    }
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::{collections::HashMap, sync::Mutex};

    use serde_json::Value;

    use super::{parse_soft, KeyValueStore, StoreError};

    /// Raw strings are kept so that corrupt payloads behave as they would on disk.
    #[derive(Default)]
    pub struct MemoryStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> MemoryStore {
            MemoryStore::default()
        }

        pub fn set_raw(&self, key: &str, raw: &str) {
            self.values.lock().unwrap().insert(key.to_string(), raw.to_string());
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<Value> {
            let values = self.values.lock().unwrap();
            parse_soft(key, values.get(key)?)
        }

        fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
            let raw = serde_json::to_string(value)?;
            self.values.lock().unwrap().insert(key.to_string(), raw);
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
