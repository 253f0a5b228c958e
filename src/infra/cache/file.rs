//! JSON file cache.
//!
//! The whole cache is one JSON object, `{ key: { value, stored_at_ms } }`.
//! Writes go to `<path>.tmp`, are fsynced and then renamed over `<path>`, so a
//! crash never leaves a half-written file behind. A missing or corrupt file
//! reads as an empty cache.
//!
//! Writers within one process are serialised by a mutex; separate processes
//! sharing a file are not coordinated.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{is_stale, Cache, Cached};
use crate::core::CacheError;
use crate::util::clock::now_ms;

#[derive(Serialize, Deserialize)]
struct Entry {
    value: Value,
    stored_at_ms: u64,
}

/// Cache persisted to a single JSON file.
pub struct FileCache<V> {
    path: PathBuf,
    ttl: Option<Duration>,
    lock: Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

impl<V> FileCache<V> {
    /// Cache stored at `path`. Parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: None,
            lock: Mutex::new(()),
            _value: PhantomData,
        }
    }

    /// Mark entries stale `ttl` after they were written.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_root(&self) -> Map<String, Value> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return Map::new(),
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(Value::Object(root)) => root,
            Ok(_) => {
                warn!(path = %self.path.display(), "cache root is not an object, ignoring");
                Map::new()
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable cache file, ignoring");
                Map::new()
            }
        }
    }

    fn write_root(&self, root: &Map<String, Value>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = tmp_path(&self.path);
        {
            let mut file = File::create(&tmp_path)?;
            serde_json::to_writer(&mut file, root)?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), entries = root.len(), "cache file written");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl<V> Cache<V> for FileCache<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Option<Cached<V>> {
        let _guard = self.lock.lock();
        let raw = self.load_root().remove(key)?;
        let entry: Entry = serde_json::from_value(raw).ok()?;
        let value = serde_json::from_value(entry.value).ok()?;
        let age = Duration::from_millis(now_ms().saturating_sub(entry.stored_at_ms));
        Some(Cached {
            value,
            is_stale: is_stale(age, self.ttl),
        })
    }

    fn set(&self, key: &str, value: V) -> Result<(), CacheError> {
        let entry = Entry {
            value: serde_json::to_value(value)?,
            stored_at_ms: now_ms(),
        };
        let _guard = self.lock.lock();
        let mut root = self.load_root();
        root.insert(key.to_owned(), serde_json::to_value(entry)?);
        self.write_root(&root)
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let _guard = self.lock.lock();
        let mut root = self.load_root();
        if root.remove(key).is_some() {
            self.write_root(&root)?;
        }
        Ok(())
    }
}
