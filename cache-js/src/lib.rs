//! Versioned key-value cache for build artifacts that survive between runs.
//!
//! Entries are persisted in a [`sled`] store at `<dir>/build-cache`, encoded with [`bincode`]. Every
//! key `k` is stored together with `k-timestamp`, the write time in milliseconds since the Unix
//! epoch, so callers can reject entries older than a source file. A transient in-memory overlay
//! sits in front of the store and is checked first.
//!
//! The store is stamped with a producer version under [`VERSION_KEY`]. Opening a store written by
//! a different version, or one whose format cannot be recognized, wipes it.

use ahash::HashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

pub use error::CacheError;

pub mod error;

/// Name of the store within the cache directory.
pub const STORE_NAME: &str = "build-cache";
/// Reserved key holding the producer version.
pub const VERSION_KEY: &str = "cache-version";
pub const TIMESTAMP_SUFFIX: &str = "-timestamp";
/// Version stamped on stores opened with [`Cache::open`].
pub const PRODUCER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How [`Cache::open`] found the store.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OpenState {
  /// Existing store of the same producer version.
  Reused,
  /// No store existed.
  Created,
  /// Store of another (or no) producer version, now emptied.
  VersionChanged,
  /// Unrecognizable store, now emptied.
  Recovered,
}

/// Milliseconds since the Unix epoch.
pub fn timestamp_of(time: SystemTime) -> u64 {
  time
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

pub fn now() -> u64 {
  timestamp_of(SystemTime::now())
}

fn timestamp_key(key: &str) -> String {
  format!("{key}{TIMESTAMP_SUFFIX}")
}

/// Keys the store uses for its own bookkeeping.
fn is_reserved_key(key: &str) -> bool {
  key == VERSION_KEY || key.ends_with(TIMESTAMP_SUFFIX)
}

fn is_lock_error(err: &sled::Error) -> bool {
  match err {
    sled::Error::Io(io) => {
      io.kind() == ErrorKind::WouldBlock || io.to_string().contains("could not acquire lock")
    }
    _ => false,
  }
}

pub struct Cache<V> {
  path: PathBuf,
  version: String,
  db: Option<Db>,
  // Value and the timestamp it was stored with.
  transient: HashMap<String, (V, u64)>,
  state: OpenState,
}

impl<V: Serialize + DeserializeOwned + Clone> Cache<V> {
  /// Opens or creates the store in `dir`, stamped with [`PRODUCER_VERSION`].
  pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
    Self::open_with_version(dir, PRODUCER_VERSION)
  }

  pub fn open_with_version(
    dir: impl AsRef<Path>,
    version: impl Into<String>,
  ) -> Result<Self, CacheError> {
    let mut cache = Cache {
      path: dir.as_ref().join(STORE_NAME),
      version: version.into(),
      db: None,
      transient: HashMap::default(),
      state: OpenState::Created,
    };
    cache.state = cache.attach()?;
    Ok(cache)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn open_state(&self) -> OpenState {
    self.state
  }

  fn attach(&mut self) -> Result<OpenState, CacheError> {
    if self.path.exists() && !self.path.is_dir() {
      error!(target: "cache_js", path = %self.path.display(), "cache store is not a database directory");
      return self.recreate();
    }
    let existed = self.path.exists();
    let db = match sled::open(&self.path) {
      Ok(db) => db,
      Err(err) if is_lock_error(&err) => {
        return Err(CacheError::Locked {
          path: self.path.clone(),
        })
      }
      Err(err @ (sled::Error::Corruption { .. } | sled::Error::Unsupported(_) | sled::Error::Io(_)))
        if existed =>
      {
        error!(target: "cache_js", path = %self.path.display(), %err, "could not detect cache file format");
        return self.recreate();
      }
      Err(err) => return Err(err.into()),
    };

    let state = if !existed {
      self.stamp(&db)?;
      OpenState::Created
    } else {
      match db.get(VERSION_KEY)? {
        Some(raw) => match bincode::deserialize::<String>(&raw) {
          Ok(stored) if stored == self.version => OpenState::Reused,
          Ok(stored) => {
            debug!(target: "cache_js", %stored, current = %self.version, "producer version has changed; recreating cache");
            self.wipe(&db)?;
            OpenState::VersionChanged
          }
          Err(err) => {
            error!(target: "cache_js", path = %self.path.display(), %err, "could not decode cache version marker");
            warn!(target: "cache_js", "recreating cache database");
            self.wipe(&db)?;
            OpenState::Recovered
          }
        },
        None => {
          debug!(target: "cache_js", current = %self.version, "cache has no version marker; recreating cache");
          self.wipe(&db)?;
          OpenState::VersionChanged
        }
      }
    };
    self.db = Some(db);
    Ok(state)
  }

  fn recreate(&mut self) -> Result<OpenState, CacheError> {
    warn!(target: "cache_js", "recreating cache database");
    self.remove_store()?;
    let db = self.open_db()?;
    self.stamp(&db)?;
    self.db = Some(db);
    Ok(OpenState::Recovered)
  }

  fn remove_store(&self) -> Result<(), CacheError> {
    if self.path.is_dir() {
      std::fs::remove_dir_all(&self.path)?;
    } else if self.path.exists() {
      std::fs::remove_file(&self.path)?;
    }
    Ok(())
  }

  fn open_db(&self) -> Result<Db, CacheError> {
    sled::open(&self.path).map_err(|err| {
      if is_lock_error(&err) {
        CacheError::Locked {
          path: self.path.clone(),
        }
      } else {
        err.into()
      }
    })
  }

  fn stamp(&self, db: &Db) -> Result<(), CacheError> {
    let marker = bincode::serialize(&self.version)?;
    db.insert(VERSION_KEY, marker)?;
    db.flush()?;
    Ok(())
  }

  fn wipe(&self, db: &Db) -> Result<(), CacheError> {
    db.clear()?;
    self.stamp(db)
  }

  /// Reads `key` regardless of its age.
  pub fn read(&mut self, key: &str) -> Option<V> {
    self.lookup(key, None)
  }

  /// Reads `key` if it was stored at or after `since`.
  pub fn read_since(&mut self, key: &str, since: u64) -> Option<V> {
    self.lookup(key, Some(since))
  }

  fn lookup(&mut self, key: &str, since: Option<u64>) -> Option<V> {
    if let Some((value, stored_at)) = self.transient.get(key) {
      if since.is_some_and(|since| since > *stored_at) {
        trace!(target: "cache_js", cache_hit = false, stale = true, transient = true, key);
        return None;
      }
      trace!(target: "cache_js", cache_hit = true, transient = true, key);
      return Some(value.clone());
    }

    let db = self.db.as_ref()?;
    let stored_at = match db.get(timestamp_key(key)) {
      Ok(Some(raw)) => <[u8; 8]>::try_from(raw.as_ref()).ok().map(u64::from_be_bytes),
      Ok(None) => None,
      Err(err) => {
        warn!(target: "cache_js", key, %err, "failed to read cache entry");
        None
      }
    };
    let Some(stored_at) = stored_at else {
      trace!(target: "cache_js", cache_hit = false, key);
      return None;
    };
    if since.is_some_and(|since| since > stored_at) {
      trace!(target: "cache_js", cache_hit = false, stale = true, key, stored_at);
      return None;
    }

    let raw = match db.get(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        trace!(target: "cache_js", cache_hit = false, key);
        return None;
      }
      Err(err) => {
        warn!(target: "cache_js", key, %err, "failed to read cache entry");
        return None;
      }
    };
    match bincode::deserialize::<V>(&raw) {
      Ok(value) => {
        trace!(target: "cache_js", cache_hit = true, transient = false, key);
        self.transient.insert(key.to_string(), (value.clone(), stored_at));
        Some(value)
      }
      Err(err) => {
        warn!(target: "cache_js", key, %err, "discarding undecodable cache entry");
        None
      }
    }
  }

  /// Stores `value` under `key`, stamped with the current time.
  pub fn store(&mut self, key: &str, value: V) -> Result<(), CacheError> {
    self.store_at(key, value, now())
  }

  /// Stores `value` under `key`, stamped with `timestamp` (e.g. a source file's modification time).
  /// A value that cannot be encoded is logged and kept only in the transient overlay.
  /// The version key and keys ending in `-timestamp` are rejected.
  pub fn store_at(&mut self, key: &str, value: V, timestamp: u64) -> Result<(), CacheError> {
    if is_reserved_key(key) {
      return Err(CacheError::ReservedKey {
        key: key.to_string(),
      });
    }
    let Some(db) = self.db.as_ref() else {
      return Err(CacheError::Closed);
    };
    let encoded = bincode::serialize(&value);
    self.transient.insert(key.to_string(), (value, timestamp));

    let encoded = match encoded {
      Ok(encoded) => encoded,
      Err(err) => {
        error!(target: "cache_js", key, %err, "failed to store entry");
        return Ok(());
      }
    };
    let mut batch = sled::Batch::default();
    batch.insert(timestamp_key(key).as_bytes(), timestamp.to_be_bytes().to_vec());
    batch.insert(key.as_bytes(), encoded);
    db.apply_batch(batch)?;
    Ok(())
  }

  /// Keeps `value` for the lifetime of this handle only.
  pub fn store_transient(&mut self, key: &str, value: V) {
    self.transient.insert(key.to_string(), (value, now()));
  }

  /// Flushes buffered writes to disk.
  pub fn sync(&self) -> Result<(), CacheError> {
    if let Some(db) = &self.db {
      db.flush()?;
    }
    Ok(())
  }

  /// Flushes and releases the store. The transient overlay is discarded.
  pub fn close(&mut self) -> Result<(), CacheError> {
    self.transient.clear();
    if let Some(db) = self.db.take() {
      db.flush()?;
    }
    Ok(())
  }

  /// Deletes the store and the transient overlay, then recreates the store stamped with the
  /// producer version. A closed cache is reopened.
  pub fn clear(&mut self) -> Result<(), CacheError> {
    self.transient.clear();
    if let Some(db) = self.db.take() {
      db.flush()?;
    }
    debug!(target: "cache_js", path = %self.path.display(), "clearing cache");
    self.remove_store()?;
    let db = self.open_db()?;
    self.stamp(&db)?;
    self.db = Some(db);
    Ok(())
  }
}
