//! Typed property accessors over a cached state document.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use turnstate_core::{StateError, TurnContext};

use crate::bot_state::{BotState, PropertyLookup};

/// Read/write handle for one named property of a [`BotState`].
///
/// The accessor holds no data of its own. Every call goes to the
/// owning state's cached document in the given turn, so the state must
/// have been loaded in that turn first.
///
/// Created with [`BotState::create_property`] or
/// [`BotState::create_property_with`].
pub struct StatePropertyAccessor<T> {
    state: BotState,
    name: String,
    default_factory: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> StatePropertyAccessor<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(
        state: BotState,
        name: String,
        default_factory: Arc<dyn Fn() -> T + Send + Sync>,
    ) -> Self {
        Self {
            state,
            name,
            default_factory,
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state this property lives in.
    pub fn state(&self) -> &BotState {
        &self.state
    }

    /// Read the property.
    ///
    /// If the property is absent, the default factory runs once, its
    /// value is written into the cached document and returned. Later
    /// reads in the same turn see that value without calling the factory
    /// again, and the materialized default takes part in change
    /// detection like any other write.
    pub fn get(&self, ctx: &mut TurnContext) -> Result<T, StateError> {
        match self.state.get_property_value::<T>(ctx, &self.name)? {
            PropertyLookup::Found(value) => Ok(value),
            PropertyLookup::Absent => {
                let value = (self.default_factory)();
                self.state.set_property_value(ctx, &self.name, &value)?;
                Ok(value)
            }
        }
    }

    /// Overwrite the property.
    pub fn set(&self, ctx: &mut TurnContext, value: T) -> Result<(), StateError> {
        self.state.set_property_value(ctx, &self.name, &value)
    }

    /// Remove the property. Removing an absent property is a no-op.
    pub fn delete(&self, ctx: &mut TurnContext) -> Result<(), StateError> {
        self.state.delete_property_value(ctx, &self.name)
    }
}

impl<T> Clone for StatePropertyAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            name: self.name.clone(),
            default_factory: Arc::clone(&self.default_factory),
        }
    }
}

impl<T> std::fmt::Debug for StatePropertyAccessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePropertyAccessor")
            .field("namespace", &self.state.namespace())
            .field("name", &self.name)
            .finish()
    }
}
