use crate::error::AppError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry<T> {
    cached_at: DateTime<Utc>,
    data: T,
}

/// On-disk JSON cache, one file per key.
#[derive(Debug, Clone)]
pub struct JsonCache {
    dir: PathBuf,
}

impl JsonCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonCache { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".league_draft")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace(['/', '\\', ':'], "_")))
    }

    /// Returns the cached value only if it was written within `max_age`.
    pub fn load_fresh<T: DeserializeOwned>(&self, key: &str, max_age: chrono::Duration) -> Option<T> {
        let (cached_at, data) = self.load_any(key)?;
        let age = Utc::now().signed_duration_since(cached_at);
        if age > max_age {
            tracing::debug!(key, age_minutes = age.num_minutes(), "cache entry is stale");
            return None;
        }
        Some(data)
    }

    /// Returns the cached value regardless of age, with its timestamp.
    pub fn load_any<T: DeserializeOwned>(&self, key: &str) -> Option<(DateTime<Utc>, T)> {
        let path = self.path_for(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CacheEntry<T>>(&content) {
            Ok(entry) => Some((entry.cached_at, entry.data)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache file");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            cached_at: Utc::now(),
            data,
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| AppError::JsonError(format!("Failed to serialize cache: {}", e)))?;
        fs::write(self.path_for(key), json)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

/// In-memory map whose entries expire after a fixed time-to-live.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash, V: Clone> MemoCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        MemoCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() <= self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().insert(key, (Instant::now(), value));
    }
}
