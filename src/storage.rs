//! Persistence layer for session state
//!
//! Every store in the deck persists itself through the [`KeyValueStore`]
//! trait: a flat namespace of string keys holding string values. [`Storage`]
//! keeps one file per key under `~/.whisperdeck/state`; [`MemoryStore`] is
//! used by tests and throwaway sessions.
//!
//! Values are read and written independently. There is no transaction across
//! keys and no locking between processes, so two sessions writing the same
//! key simply overwrite each other.

use crate::logging::log_state_write;
use anyhow::{Context, Result};
use dirs::home_dir;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Fixed keys for persisted state
pub mod keys {
    pub const FAVORITES: &str = "whisperdeck-favorites";
    pub const LEDGER: &str = "whisperdeck-gamification";
    pub const ARCHITECT_FLAG: &str = "whisperdeck-architect";
    pub const ARCHITECT_DATE: &str = "whisperdeck-architect-date";
    pub const LAYOUT_PREFIX: &str = "whisperdeck-layout-";
    pub const TEMPLATES: &str = "whisperdeck-templates";
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// String key/value persistence, shaped like browser local storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode a JSON value, treating anything unreadable as absent
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = key, error = %e, "Discarding malformed persisted state");
            None
        }
    }
}

/// Encode and write a JSON value; failures are logged, never raised
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .context("Failed to serialize state")
        .and_then(|raw| store.set(key, &raw));
    log_state_write(key, &result);
}

/// Write a raw string value; failures are logged, never raised
pub fn save_raw(store: &dyn KeyValueStore, key: &str, value: &str) {
    let result = store.set(key, value);
    log_state_write(key, &result);
}

/// Remove a key; failures are logged, never raised
pub fn remove_key(store: &dyn KeyValueStore, key: &str) {
    let result = store.remove(key);
    log_state_write(key, &result);
}

/// File-backed store rooted at the WhisperDeck base directory
#[derive(Debug, Clone)]
pub struct Storage {
    base_dir: PathBuf,
}

impl Storage {
    /// Create a new Storage instance with default configuration
    ///
    /// Uses `~/.whisperdeck` as the base directory, or the value of the
    /// `WHISPERDECK_BASE_DIR` environment variable if set.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = if let Ok(custom_dir) = std::env::var("WHISPERDECK_BASE_DIR") {
            PathBuf::from(custom_dir)
        } else {
            home_dir()
                .context("Could not find home directory")?
                .join(".whisperdeck")
        };

        Ok(Self { base_dir })
    }

    pub fn new_with_base(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Create the directory layout
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.state_dir()).with_context(|| {
            format!("Failed to create state directory: {}", self.state_dir().display())
        })?;
        Ok(())
    }

    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("state")
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.state_dir().join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&path, value)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove state file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .take(64)
        .collect()
}

/// Process-local store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
