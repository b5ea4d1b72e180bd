//! Key/value storage behind session and token state.
//!
//! The browser original kept everything in `localStorage`; here the same
//! contract is a trait so the state can live in memory for tests or in a JSON
//! file next to the user's config. Writes are synchronous, which is what lets
//! the teardown path clear every key before yielding control. No module
//! outside `session` and `token` reads keys directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::error;

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Volatile storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}

/// File-backed storage with write-through persistence.
///
/// The whole map is rewritten on every mutation. Session state is a handful
/// of small strings, so the simplicity wins over journaling.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`, starting empty if the file is missing or
    /// unreadable. A corrupt file is discarded rather than propagated; losing
    /// a cached session only forces a new sign-in.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<BTreeMap<String, String>>(&raw).ok())
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        let serialized = match serde_json::to_string_pretty(entries) {
            Ok(serialized) => serialized,
            Err(err) => {
                error!("Failed to serialize session storage: {err}");
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                error!("Failed to create storage directory: {err}");
                return;
            }
        }

        if let Err(err) = fs::write(&self.path, serialized) {
            error!("Failed to write session storage: {err}");
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}
