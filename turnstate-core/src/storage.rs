//! The storage boundary: how state documents persist between turns.

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Field that carries a document's version token on the storage wire.
///
/// The state layer lifts it out of loaded documents and puts it back on
/// write, so it never appears as an application property.
pub const E_TAG_FIELD: &str = "eTag";

/// Version token that skips the concurrency check.
pub const E_TAG_WILDCARD: &str = "*";

/// A batch of documents addressed by storage key.
pub type StoreItems = HashMap<String, serde_json::Value>;

/// Key → document store used to persist scoped state.
///
/// The trait is deliberately small: batched read, batched write and
/// delete. Backends that support optimistic concurrency report a stale
/// write as [`StorageError::Conflict`]; the state layer surfaces that
/// as a failed save and never retries it.
///
/// Implementations:
/// - `MemoryStorage` (turnstate-memory): process-local, eTag checked
/// - `InMemoryStorage` (test-utils): instrumented test double
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the documents for `keys`.
    ///
    /// Keys with no stored document are simply absent from the result.
    /// That is not an error.
    async fn read(&self, keys: &[String]) -> Result<StoreItems, StorageError>;

    /// Create or overwrite every document in `changes`.
    async fn write(&self, changes: StoreItems) -> Result<(), StorageError>;

    /// Delete the documents for `keys`. Missing keys are a no-op.
    async fn delete(&self, keys: &[String]) -> Result<(), StorageError>;
}
