///! Persisted front-end state
///!
///! Everything goes through the [`KeyValueStore`] trait (string keys, string
///! values, last writer wins). [`Preferences`] layers the typed entries on top.

mod file;
mod memory;
mod preferences;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use preferences::{FavoriteEntry, HISTORY_LIMIT, Preferences};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
