//! Error types for storage, state and turn processing.

use thiserror::Error;

/// Errors surfaced by a [`Storage`](crate::storage::Storage) backend.
///
/// These propagate verbatim through the state layer. Nothing in this
/// workspace retries them; that is the backend's or the caller's call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Optimistic concurrency check failed: the stored version moved
    /// since this document was read.
    #[error("version conflict on {key}: expected eTag {expected}, found {actual}")]
    Conflict {
        /// Storage key that was written.
        key: String,
        /// eTag carried by the incoming document.
        expected: String,
        /// eTag currently stored.
        actual: String,
    },

    /// A document could not be encoded or decoded by the backend.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from loading, saving and accessing scoped state.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// A required identifier was blank. Raised before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A property was read or written before the scope was loaded in
    /// this turn.
    #[error("state for {namespace} has not been loaded in this turn")]
    PreconditionViolated {
        /// Namespace of the scope that was accessed.
        namespace: String,
    },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A property value or stored document had the wrong shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The turn was cancelled while a storage operation was pending.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors that end a turn.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TurnError {
    /// Loading or saving state failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The application handler failed.
    #[error("handler failed: {0}")]
    Handler(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
