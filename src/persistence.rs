//! Local key/value persistence.
//!
//! Each named slice of application state lives under its own key. Composite
//! values are JSON; a value that fails to parse is reported as absent so a
//! corrupted entry never blocks startup.
//!
//! Storage location: ~/.rupveda/storage/<key>

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Names of the persisted slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Theme,
    GenerationSettings,
    GenerationHistory,
    CommunityPrompts,
    GeneratorPrompt,
    GeneratorImage,
    HasOnboarded,
    AvatarFeedback,
}

impl StorageKey {
    pub const ALL: [StorageKey; 8] = [
        StorageKey::Theme,
        StorageKey::GenerationSettings,
        StorageKey::GenerationHistory,
        StorageKey::CommunityPrompts,
        StorageKey::GeneratorPrompt,
        StorageKey::GeneratorImage,
        StorageKey::HasOnboarded,
        StorageKey::AvatarFeedback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Theme => "theme",
            StorageKey::GenerationSettings => "generationSettings",
            StorageKey::GenerationHistory => "generationHistory",
            StorageKey::CommunityPrompts => "communityPrompts",
            StorageKey::GeneratorPrompt => "generatorPrompt",
            StorageKey::GeneratorImage => "generatorImage",
            StorageKey::HasOnboarded => "hasOnboarded",
            StorageKey::AvatarFeedback => "avatarFeedback",
        }
    }
}

/// Raw string storage. Implementations must treat removing a missing key as success.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn io_error(key: &str, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.root).map_err(|e| Self::io_error(key, e))?;

        // Write-then-rename so a crash never leaves a half-written value behind
        let tmp_path = self.root.join(format!(".{}.tmp", key));
        let mut file = fs::File::create(&tmp_path).map_err(|e| Self::io_error(key, e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| Self::io_error(key, e))?;
        file.sync_all().map_err(|e| Self::io_error(key, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| Self::io_error(key, e))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// In-memory store for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Read a raw string value; read failures are logged and treated as absent
pub fn load_string<S: KeyValueStore + ?Sized>(store: &S, key: StorageKey) -> Option<String> {
    match store.get(key.as_str()) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read '{}' from storage: {}", key.as_str(), e);
            None
        }
    }
}

/// Read and parse a JSON value; corrupted entries are logged and treated as absent
pub fn load_json<T, S>(store: &S, key: StorageKey) -> Option<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = load_string(store, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupted '{}' entry: {}", key.as_str(), e);
            None
        }
    }
}

/// Write a raw string value, logging failures
pub fn save_string<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey, value: &str) {
    if let Err(e) = store.set(key.as_str(), value) {
        warn!("Failed to write '{}' to storage: {}", key.as_str(), e);
    } else {
        debug!("Persisted '{}' ({} bytes)", key.as_str(), value.len());
    }
}

/// Serialize and write a JSON value, logging failures
pub fn save_json<T, S>(store: &mut S, key: StorageKey, value: &T)
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(json) => save_string(store, key, &json),
        Err(source) => {
            let e = PersistenceError::Serialize {
                key: key.as_str().to_string(),
                source,
            };
            warn!("{}", e);
        }
    }
}

pub fn remove_key<S: KeyValueStore + ?Sized>(store: &mut S, key: StorageKey) {
    if let Err(e) = store.remove(key.as_str()) {
        warn!("Failed to remove '{}' from storage: {}", key.as_str(), e);
    }
}
