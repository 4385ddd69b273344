/*
 * Local key-value cache for UI-scoped settings
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use serde_json::Value;
use tracing::warn;
use crate::models::{DashboardError, Result};

/// String-typed key-value storage that survives restarts.
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    /// Writes all entries at once.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<()>;
}

/// JSON object on disk, rewritten through a temp file on every batch.
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileCache {
    /// Opens the cache at `path`. A missing or unreadable JSON file starts
    /// empty; the next batch write replaces it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => parse_entries(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Settings cache is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(DashboardError::Cache(format!(
                    "Failed to read settings cache {}: {e}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Non-string values are kept as their JSON text, so `true` reads back as "true".
fn parse_entries(raw: &str) -> Result<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let values: BTreeMap<String, Value> = serde_json::from_str(raw)?;
    Ok(values
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect())
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = guard.clone();
        for (key, value) in entries {
            updated.insert((*key).to_string(), value.clone());
        }
        self.persist(&updated)?;
        *guard = updated;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            guard.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_cache_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let cache = FileCache::open(&path).unwrap();
        assert_eq!(cache.get("autoRefresh"), None);
        cache
            .set_many(&[("autoRefresh", "true".to_string()), ("refreshInterval", "15".to_string())])
            .unwrap();

        let reopened = FileCache::open(&path).unwrap();
        assert_eq!(reopened.get("autoRefresh").as_deref(), Some("true"));
        assert_eq!(reopened.get("refreshInterval").as_deref(), Some("15"));
    }

    #[test]
    fn corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let cache = FileCache::open(&path).unwrap();
        assert_eq!(cache.get("autoRefresh"), None);

        cache.set_many(&[("autoRefresh", "true".to_string())]).unwrap();
        let reopened = FileCache::open(&path).unwrap();
        assert_eq!(reopened.get("autoRefresh").as_deref(), Some("true"));
    }

    #[test]
    fn typed_json_values_read_back_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"autoRefresh": true, "refreshInterval": 15, "theme": "dark"}"#).unwrap();

        let cache = FileCache::open(&path).unwrap();
        assert_eq!(cache.get("autoRefresh").as_deref(), Some("true"));
        assert_eq!(cache.get("refreshInterval").as_deref(), Some("15"));
        assert_eq!(cache.get("theme").as_deref(), Some("dark"));
    }
}
