//! Convenience methods on [`TurnContext`] for reading and writing state.

use serde::Serialize;
use serde::de::DeserializeOwned;
use turnstate_core::{StateError, TurnContext};

use crate::accessor::StatePropertyAccessor;

/// Read and write properties through the turn context instead of the
/// accessor.
pub trait TurnContextStateExt {
    /// Equivalent to `accessor.get(self)`.
    fn get_state<T>(&mut self, accessor: &StatePropertyAccessor<T>) -> Result<T, StateError>
    where
        T: Serialize + DeserializeOwned;

    /// Equivalent to `accessor.set(self, value)`.
    fn set_state<T>(
        &mut self,
        accessor: &StatePropertyAccessor<T>,
        value: T,
    ) -> Result<(), StateError>
    where
        T: Serialize + DeserializeOwned;
}

impl TurnContextStateExt for TurnContext {
    fn get_state<T>(&mut self, accessor: &StatePropertyAccessor<T>) -> Result<T, StateError>
    where
        T: Serialize + DeserializeOwned,
    {
        accessor.get(self)
    }

    fn set_state<T>(
        &mut self,
        accessor: &StatePropertyAccessor<T>,
        value: T,
    ) -> Result<(), StateError>
    where
        T: Serialize + DeserializeOwned,
    {
        accessor.set(self, value)
    }
}
