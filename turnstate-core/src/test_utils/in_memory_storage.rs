//! InMemoryStorage: HashMap-backed Storage that records what it was asked to do.

use crate::error::StorageError;
use crate::storage::{Storage, StoreItems};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Test double for [`Storage`].
///
/// Counts reads, records every write batch, and can be told to fail or
/// to hang forever (for cancellation tests). No eTag checking.
#[derive(Default)]
pub struct InMemoryStorage {
    data: Mutex<HashMap<String, serde_json::Value>>,
    reads: AtomicUsize,
    deletes: AtomicUsize,
    written: Mutex<Vec<StoreItems>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hang: AtomicBool,
}

impl InMemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as a write.
    pub fn with_item(self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let Ok(mut data) = self.data.lock() {
            data.insert(key.into(), value);
        }
        self
    }

    /// The document currently stored under `key`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.lock().ok().and_then(|d| d.get(key).cloned())
    }

    /// Number of `read` calls served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `write` calls that succeeded.
    pub fn write_count(&self) -> usize {
        self.written.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Number of `delete` calls served.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Every successful write batch, oldest first.
    pub fn written(&self) -> Vec<StoreItems> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Make subsequent reads fail with [`StorageError::Unavailable`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with [`StorageError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every operation pend forever.
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn read(&self, keys: &[String]) -> Result<StoreItems, StorageError> {
        self.maybe_hang().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("read failure injected".into()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        let data = self
            .data
            .lock()
            .map_err(|e| StorageError::Other(e.to_string().into()))?;
        Ok(keys
            .iter()
            .filter_map(|k| data.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn write(&self, changes: StoreItems) -> Result<(), StorageError> {
        self.maybe_hang().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write failure injected".into()));
        }
        let mut data = self
            .data
            .lock()
            .map_err(|e| StorageError::Other(e.to_string().into()))?;
        for (k, v) in &changes {
            data.insert(k.clone(), v.clone());
        }
        drop(data);
        self.written
            .lock()
            .map_err(|e| StorageError::Other(e.to_string().into()))?
            .push(changes);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        self.maybe_hang().await;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut data = self
            .data
            .lock()
            .map_err(|e| StorageError::Other(e.to_string().into()))?;
        for k in keys {
            data.remove(k);
        }
        Ok(())
    }
}
