use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::KvError;

/// A key-value pair with its replication version.
///
/// Versions are assigned by the node-local counter in `VersionedStore`; on
/// replication a peer adopts the coordinator's version verbatim, so equal
/// versions across nodes imply the same write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    pub version: i64,
}

struct StoreInner {
    data: HashMap<String, KeyValue>,
    /// Node-local version counter. Never decreases.
    version: i64,
}

/// In-memory key-value store with versioning.
///
/// Writes take the exclusive lock, reads the shared lock; a reader can never
/// observe a torn (key, value, version) triple.
pub struct VersionedStore {
    inner: RwLock<StoreInner>,
}

impl VersionedStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                data: HashMap::new(),
                version: 0,
            }),
        }
    }

    /// Stores a value under the given key and returns the assigned version.
    pub async fn set(&self, key: &str, value: &str) -> Result<i64, KvError> {
        if key.is_empty() {
            return Err(KvError::EmptyKey);
        }

        let mut inner = self.inner.write().await;
        inner.version += 1;
        let version = inner.version;
        inner.data.insert(
            key.to_string(),
            KeyValue {
                key: key.to_string(),
                value: value.to_string(),
                version,
            },
        );

        Ok(version)
    }

    /// Applies an inbound replicated write carrying the coordinator's version.
    ///
    /// Raises the local counter to at least `version` so the next local write
    /// is ordered after everything this node has seen. A replica whose version
    /// is not newer than the stored one is dropped silently; late or
    /// duplicated deliveries never regress a key.
    pub async fn set_with_version(
        &self,
        key: &str,
        value: &str,
        version: i64,
    ) -> Result<(), KvError> {
        if key.is_empty() {
            return Err(KvError::EmptyKey);
        }

        let mut inner = self.inner.write().await;
        if version > inner.version {
            inner.version = version;
        }

        if let Some(existing) = inner.data.get(key)
            && existing.version >= version
        {
            tracing::debug!(
                "Dropping stale replica for {} (incoming v{}, stored v{})",
                key,
                version,
                existing.version
            );
            return Ok(());
        }

        inner.data.insert(
            key.to_string(),
            KeyValue {
                key: key.to_string(),
                value: value.to_string(),
                version,
            },
        );

        Ok(())
    }

    /// Retrieves the value for the given key.
    ///
    /// Returns a copy; the stored entry is never exposed.
    pub async fn get(&self, key: &str) -> Option<KeyValue> {
        let inner = self.inner.read().await;
        inner.data.get(key).cloned()
    }

    /// Returns the current value of the node-local version counter.
    pub async fn current_version(&self) -> i64 {
        let inner = self.inner.read().await;
        inner.version
    }
}

impl Default for VersionedStore {
    fn default() -> Self {
        Self::new()
    }
}
