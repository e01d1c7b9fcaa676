use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
  /// Another process holds the store.
  #[error("cache store {} is locked by another process; is another build still running?", .path.display())]
  Locked { path: PathBuf },

  #[error("cache database error: {0}")]
  Database(#[from] sled::Error),

  #[error("cache encoding error: {0}")]
  Encode(#[from] bincode::Error),

  #[error("cache i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("cache key {key:?} is reserved for the store's own entries")]
  ReservedKey { key: String },

  #[error("cache is closed")]
  Closed,
}
