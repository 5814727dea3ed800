//! # turnstate-core: Protocol types for per-turn conversational state
//!
//! This crate defines the boundaries that the `turnstate` engine is
//! written against. It has no behavior of its own beyond fingerprinting
//! cached documents; everything that loads, diffs and persists state
//! lives one layer up.
//!
//! | Type | What it is |
//! |------|-----------|
//! | [`Storage`] | Batched key → document store, the persistence boundary |
//! | [`TurnContext`] | Everything owned by one inbound turn, including the state cache |
//! | [`Activity`] | Read-only identity of the inbound message (channel, user, conversation) |
//! | [`CachedState`] | A loaded document plus the fingerprint it was loaded with |
//!
//! ## Ownership
//!
//! A [`TurnContext`] is exclusively owned by the task processing that
//! turn. State caches are stored inside it and handed around as
//! `&mut TurnContext`, so nothing in this crate needs a lock.
//!
//! ## Documents
//!
//! State documents are `serde_json::Map<String, Value>`. Values are
//! stored as JSON so any `Serialize` type can be a property, and the
//! storage layer never needs to know what the application keeps in them.

#![deny(missing_docs)]

pub mod activity;
pub mod cache;
pub mod context;
pub mod error;
pub mod id;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports for convenience
pub use activity::Activity;
pub use cache::{CachedState, Fingerprint, StateDocument};
pub use context::TurnContext;
pub use error::{StateError, StorageError, TurnError};
pub use id::{ChannelId, ConversationId, UserId};
pub use storage::{E_TAG_FIELD, E_TAG_WILDCARD, Storage, StoreItems};
