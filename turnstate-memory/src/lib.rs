#![deny(missing_docs)]
//! In-memory implementation of turnstate's Storage trait.
//!
//! Uses a `HashMap` behind a `RwLock` for concurrent access. Documents
//! that are JSON objects get an `"eTag"` field stamped on every write,
//! and a write carrying a stale eTag is rejected with
//! [`StorageError::Conflict`]. Documents without an eTag, or with the
//! wildcard `"*"`, always overwrite.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use turnstate_core::error::StorageError;
use turnstate_core::storage::{Storage, StoreItems};

pub use turnstate_core::storage::{E_TAG_FIELD, E_TAG_WILDCARD};

struct Inner {
    data: HashMap<String, serde_json::Value>,
    next_e_tag: u64,
}

/// In-memory storage backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for testing, prototyping, and single-process bots where
/// state does not need to survive a restart.
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                data: HashMap::new(),
                next_e_tag: 1,
            }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn e_tag_of(value: &serde_json::Value) -> Option<&str> {
    value.get(E_TAG_FIELD).and_then(|v| v.as_str())
}

/// Check an incoming document against what is stored.
fn check_e_tag(
    key: &str,
    incoming: &serde_json::Value,
    stored: Option<&serde_json::Value>,
) -> Result<(), StorageError> {
    let (Some(expected), Some(stored)) = (e_tag_of(incoming), stored) else {
        return Ok(());
    };
    if expected == E_TAG_WILDCARD {
        return Ok(());
    }
    let actual = e_tag_of(stored).unwrap_or_default();
    if expected != actual {
        tracing::debug!(key, expected, actual, "rejecting stale write");
        return Err(StorageError::Conflict {
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, keys: &[String]) -> Result<StoreItems, StorageError> {
        let inner = self.inner.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| inner.data.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn write(&self, changes: StoreItems) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;

        // Validate the whole batch first so a conflict writes nothing.
        for (key, value) in &changes {
            check_e_tag(key, value, inner.data.get(key))?;
        }

        for (key, mut value) in changes {
            if let Some(obj) = value.as_object_mut() {
                let e_tag = inner.next_e_tag;
                inner.next_e_tag += 1;
                obj.insert(
                    E_TAG_FIELD.to_string(),
                    serde_json::Value::String(e_tag.to_string()),
                );
            }
            inner.data.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        for key in keys {
            inner.data.remove(key);
        }
        Ok(())
    }
}
