use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// The engine performs no implicit retries: a failed write surfaces to the
/// caller as-is, so at-most-once semantics per mutating call hold.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value storage port.
///
/// Progress and lockout records are JSON strings under collision-free scoped
/// keys. The port is async so a real backend (browser storage bridge, remote
/// store) can sit behind it; callers await each write before the next read,
/// so observable ordering does not depend on the backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn put(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryKv {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored entries, for test assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("kv lock poisoned").len()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove_roundtrip() {
        let kv = InMemoryKv::new();
        assert!(kv.is_empty());

        kv.put("a", "1".into()).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some("1".to_string()));

        kv.put("a", "2".into()).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some("2".to_string()));
        assert_eq!(kv.len(), 1);

        kv.remove("a").await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), None);

        // removing a missing key is not an error
        kv.remove("a").await.unwrap();
    }
}
