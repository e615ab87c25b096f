use super::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::errors::PersistenceError;
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    /// Write time, ms since epoch
    timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub inserts: u64,
}

pub struct CacheStore {
    prefix: String,
    ttl_millis: i64,
    snapshot_path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    metrics: Mutex<CacheMetrics>,
}

impl CacheStore {
    /// Loads the snapshot when one is configured and readable
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let snapshot_path = if config.snapshot_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&config.snapshot_path))
        };

        let store = Self {
            prefix: config.key_prefix.clone(),
            ttl_millis: config.ttl().as_millis() as i64,
            snapshot_path,
            clock,
            entries: Mutex::new(HashMap::new()),
            metrics: Mutex::new(CacheMetrics::default()),
        };

        if let Some(path) = store.snapshot_path.clone() {
            if path.exists() {
                match store.load_snapshot(&path) {
                    Ok(count) => logger::debug(
                        LogTag::Cache,
                        &format!("Loaded {} cache entries from {}", count, path.display()),
                    ),
                    Err(e) => logger::warning(
                        LogTag::Cache,
                        &format!("Ignoring unreadable cache snapshot: {}", e),
                    ),
                }
            }
        }
        store
    }

    pub fn wallet_key(&self, wallet: &str) -> String {
        format!("{}{}", self.prefix, wallet)
    }

    pub fn transactions_key(&self, wallet: &str) -> String {
        format!("{}transactions_{}", self.prefix, wallet)
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(value)?;
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
        };
        self.entries.lock().insert(key.to_string(), entry);
        self.metrics.lock().inserts += 1;

        if self.snapshot_path.is_some() {
            if let Err(e) = self.write_snapshot() {
                logger::warning(LogTag::Cache, &format!("Cache snapshot write failed: {}", e));
            }
        }
        Ok(())
    }

    /// None when missing, expired (evicted here) or not decodable as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_millis();
        let data = {
            let mut entries = self.entries.lock();
            let lookup = entries
                .get(key)
                .map(|entry| (self.is_expired(entry, now), entry.data.clone()));
            match lookup {
                Some((true, _)) => {
                    entries.remove(key);
                    let mut metrics = self.metrics.lock();
                    metrics.misses += 1;
                    metrics.expirations += 1;
                    logger::debug(LogTag::Cache, &format!("Expired {}", key));
                    return None;
                }
                Some((false, data)) => data,
                None => {
                    self.metrics.lock().misses += 1;
                    return None;
                }
            }
        };

        match serde_json::from_value(data) {
            Ok(value) => {
                self.metrics.lock().hits += 1;
                Some(value)
            }
            Err(e) => {
                logger::warning(LogTag::Cache, &format!("Discarding undecodable entry {}: {}", key, e));
                self.entries.lock().remove(key);
                self.metrics.lock().misses += 1;
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().clone()
    }

    fn is_expired(&self, entry: &CacheEntry, now: i64) -> bool {
        now - entry.timestamp > self.ttl_millis
    }

    pub fn write_snapshot(&self) -> Result<(), PersistenceError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let text = {
            let entries = self.entries.lock();
            serde_json::to_string(&*entries)?
        };
        let io_err = |e: std::io::Error| PersistenceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        std::fs::write(path, text).map_err(io_err)
    }

    /// Expired entries are dropped while loading
    fn load_snapshot(&self, path: &Path) -> Result<usize, PersistenceError> {
        let text = std::fs::read_to_string(path).map_err(|e| PersistenceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let loaded: HashMap<String, CacheEntry> = serde_json::from_str(&text)?;
        let now = self.clock.now_millis();

        let mut entries = self.entries.lock();
        for (key, entry) in loaded {
            if !self.is_expired(&entry, now) {
                entries.insert(key, entry);
            }
        }
        Ok(entries.len())
    }
}
