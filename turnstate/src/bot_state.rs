//! Scoped state: load once per turn, diff by fingerprint, save on change.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use turnstate_core::{
    CachedState, E_TAG_FIELD, StateDocument, StateError, Storage, StoreItems, TurnContext,
    TurnError,
};

use crate::accessor::StatePropertyAccessor;
use crate::config::StateConfig;
use crate::middleware::{Middleware, Next};
use crate::scope::{ConversationScope, PrivateConversationScope, StateScope, UserScope};

/// Outcome of looking up a property in a cached document.
pub(crate) enum PropertyLookup<T> {
    Found(T),
    Absent,
}

/// One namespace of persistent state (user, conversation, ...).
///
/// A `BotState` is shared by every turn; the document it manages is
/// cached per turn inside the [`TurnContext`]. The lifecycle within a
/// turn is:
///
/// 1. [`load`](Self::load) reads the document from storage once and
///    fingerprints it.
/// 2. Property accessors read and write the cached document in memory.
/// 3. [`save_changes`](Self::save_changes) writes the document back only
///    if its fingerprint moved (or when forced), then drops the cache so
///    the next load re-reads.
///
/// Cloning is cheap; clones share storage and scope.
#[derive(Clone)]
pub struct BotState {
    storage: Arc<dyn Storage>,
    scope: Arc<dyn StateScope>,
    config: StateConfig,
}

impl BotState {
    /// Create state for a custom scope.
    ///
    /// Fails with [`StateError::InvalidArgument`] if the scope's
    /// namespace is blank.
    pub fn new(
        storage: Arc<dyn Storage>,
        scope: impl StateScope + 'static,
    ) -> Result<Self, StateError> {
        if scope.namespace().trim().is_empty() {
            return Err(StateError::InvalidArgument(
                "state namespace is required".into(),
            ));
        }
        Ok(Self::from_parts(storage, Arc::new(scope)))
    }

    fn from_parts(storage: Arc<dyn Storage>, scope: Arc<dyn StateScope>) -> Self {
        Self {
            storage,
            scope,
            config: StateConfig::default(),
        }
    }

    /// State keyed by channel and user.
    pub fn user(storage: Arc<dyn Storage>) -> Self {
        Self::from_parts(storage, Arc::new(UserScope))
    }

    /// State keyed by channel and conversation.
    pub fn conversation(storage: Arc<dyn Storage>) -> Self {
        Self::from_parts(storage, Arc::new(ConversationScope))
    }

    /// State keyed by channel, conversation and user.
    pub fn private_conversation(storage: Arc<dyn Storage>) -> Self {
        Self::from_parts(storage, Arc::new(PrivateConversationScope))
    }

    /// Replace the middleware configuration.
    pub fn with_config(mut self, config: StateConfig) -> Self {
        self.config = config;
        self
    }

    /// Current middleware configuration.
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Name of the turn-context cache slot this state uses.
    pub fn namespace(&self) -> &str {
        self.scope.namespace()
    }

    /// Storage key for this turn's partition.
    pub fn storage_key(&self, ctx: &TurnContext) -> Result<String, StateError> {
        self.scope.storage_key(ctx)
    }

    /// Create a typed accessor for `name` that defaults to `T::default()`.
    pub fn create_property<T>(
        &self,
        name: impl Into<String>,
    ) -> Result<StatePropertyAccessor<T>, StateError>
    where
        T: Default + Serialize + DeserializeOwned + 'static,
    {
        self.create_property_with(name, T::default)
    }

    /// Create a typed accessor for `name` with a custom default factory.
    pub fn create_property_with<T, F>(
        &self,
        name: impl Into<String>,
        default_factory: F,
    ) -> Result<StatePropertyAccessor<T>, StateError>
    where
        T: Serialize + DeserializeOwned + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let name = name.into();
        validate_property_name(&name)?;
        Ok(StatePropertyAccessor::new(
            self.clone(),
            name,
            Arc::new(default_factory),
        ))
    }

    /// Whether this turn has a cached copy of the document.
    pub fn is_loaded(&self, ctx: &TurnContext) -> bool {
        ctx.cached_state(self.namespace()).is_some()
    }

    /// Whether the cached document differs from what was loaded.
    /// False when nothing is cached.
    pub fn is_changed(&self, ctx: &TurnContext) -> bool {
        ctx.cached_state(self.namespace())
            .is_some_and(CachedState::is_changed)
    }

    /// Read the document into the turn's cache.
    ///
    /// Without `force`, a turn that already holds a cached copy is left
    /// alone. A missing document loads as empty. If the turn is
    /// cancelled while the read is pending, the read is abandoned, the
    /// cache is left as it was and [`StateError::Cancelled`] is returned.
    pub async fn load(&self, ctx: &mut TurnContext, force: bool) -> Result<(), StateError> {
        let namespace = self.namespace();
        if !force && ctx.cached_state(namespace).is_some() {
            tracing::trace!(namespace, "state already cached");
            return Ok(());
        }

        let key = self.storage_key(ctx)?;
        let token = ctx.cancellation_token().clone();
        let mut items = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(namespace, key = %key, "state load cancelled");
                return Err(StateError::Cancelled);
            }
            items = self.storage.read(std::slice::from_ref(&key)) => items?,
        };

        let mut document = match items.remove(&key) {
            None => StateDocument::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(StateError::Serialization(format!(
                    "stored state at {key} is not an object: {other}"
                )));
            }
        };

        let e_tag = match document.remove(E_TAG_FIELD) {
            Some(Value::String(tag)) => Some(tag),
            _ => None,
        };

        tracing::debug!(
            namespace,
            key = %key,
            properties = document.len(),
            e_tag = ?e_tag,
            "state loaded"
        );
        ctx.set_cached_state(namespace, CachedState::new(document).with_e_tag(e_tag));
        Ok(())
    }

    /// Write the cached document back if it changed.
    ///
    /// - nothing cached, not forced: no-op
    /// - cached and unchanged, not forced: no-op, cache kept
    /// - changed or forced: one write of the whole document, then the
    ///   cache is evicted so the next [`load`](Self::load) re-reads
    ///
    /// A forced save with nothing cached writes an empty document.
    /// The version the document was loaded at goes out with the write,
    /// so a backend that checks versions rejects a stale save.
    /// Storage errors (including version conflicts) are returned as-is
    /// and leave the cache in place. Cancellation while the write is
    /// pending returns [`StateError::Cancelled`], also leaving the cache.
    pub async fn save_changes(&self, ctx: &mut TurnContext, force: bool) -> Result<(), StateError> {
        let namespace = self.namespace();
        let document = match ctx.cached_state(namespace) {
            Some(cached) if force || cached.is_changed() => {
                let mut document = cached.document().clone();
                if let Some(tag) = cached.e_tag() {
                    document.insert(E_TAG_FIELD.to_string(), Value::String(tag.to_string()));
                }
                document
            }
            Some(_) => {
                tracing::trace!(namespace, "state unchanged, skipping save");
                return Ok(());
            }
            None if force => StateDocument::new(),
            None => return Ok(()),
        };

        let key = self.storage_key(ctx)?;
        let mut changes = StoreItems::new();
        changes.insert(key.clone(), Value::Object(document));

        let token = ctx.cancellation_token().clone();
        tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(namespace, key = %key, "state save cancelled");
                return Err(StateError::Cancelled);
            }
            result = self.storage.write(changes) => result?,
        }

        ctx.evict_cached_state(namespace);
        tracing::debug!(namespace, key = %key, forced = force, "state saved");
        Ok(())
    }

    /// Empty the cached document without touching storage.
    ///
    /// The load-time fingerprint is kept, so the next save writes an
    /// empty document if there was anything to clear and nothing
    /// otherwise. Does nothing if the state is not loaded.
    pub fn clear(&self, ctx: &mut TurnContext) {
        let namespace = self.namespace();
        if let Some(cached) = ctx.cached_state_mut(namespace) {
            *cached = cached.cleared();
            tracing::debug!(namespace, "state cleared");
        }
    }

    /// Drop the cached document and delete it from storage.
    pub async fn delete(&self, ctx: &mut TurnContext) -> Result<(), StateError> {
        let namespace = self.namespace();
        let key = self.storage_key(ctx)?;
        let token = ctx.cancellation_token().clone();
        tokio::select! {
            biased;
            () = token.cancelled() => return Err(StateError::Cancelled),
            result = self.storage.delete(std::slice::from_ref(&key)) => result?,
        }
        ctx.evict_cached_state(namespace);
        tracing::debug!(namespace, key = %key, "state deleted");
        Ok(())
    }

    fn cached<'c>(&self, ctx: &'c TurnContext) -> Result<&'c CachedState, StateError> {
        ctx.cached_state(self.namespace())
            .ok_or_else(|| self.not_loaded())
    }

    fn cached_mut<'c>(&self, ctx: &'c mut TurnContext) -> Result<&'c mut CachedState, StateError> {
        ctx.cached_state_mut(self.namespace())
            .ok_or_else(|| self.not_loaded())
    }

    fn not_loaded(&self) -> StateError {
        StateError::PreconditionViolated {
            namespace: self.namespace().to_string(),
        }
    }

    pub(crate) fn get_property_value<T: DeserializeOwned>(
        &self,
        ctx: &TurnContext,
        name: &str,
    ) -> Result<PropertyLookup<T>, StateError> {
        validate_property_name(name)?;
        match self.cached(ctx)?.document().get(name) {
            None => Ok(PropertyLookup::Absent),
            Some(value) => serde_json::from_value(value.clone())
                .map(PropertyLookup::Found)
                .map_err(|e| StateError::Serialization(format!("property {name}: {e}"))),
        }
    }

    pub(crate) fn set_property_value<T: Serialize>(
        &self,
        ctx: &mut TurnContext,
        name: &str,
        value: &T,
    ) -> Result<(), StateError> {
        validate_property_name(name)?;
        let value = serde_json::to_value(value)
            .map_err(|e| StateError::Serialization(format!("property {name}: {e}")))?;
        self.cached_mut(ctx)?
            .document_mut()
            .insert(name.to_string(), value);
        Ok(())
    }

    pub(crate) fn delete_property_value(
        &self,
        ctx: &mut TurnContext,
        name: &str,
    ) -> Result<(), StateError> {
        validate_property_name(name)?;
        self.cached_mut(ctx)?.document_mut().remove(name);
        Ok(())
    }
}

impl std::fmt::Debug for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotState")
            .field("namespace", &self.namespace())
            .field("config", &self.config)
            .finish()
    }
}

fn validate_property_name(name: &str) -> Result<(), StateError> {
    if name.trim().is_empty() {
        return Err(StateError::InvalidArgument(
            "property name is required".into(),
        ));
    }
    if name == E_TAG_FIELD {
        return Err(StateError::InvalidArgument(format!(
            "property name {E_TAG_FIELD} is reserved for storage versioning"
        )));
    }
    Ok(())
}

/// Load on the way in, save on the way out.
///
/// A failed load ends the turn before the handler runs. When the handler
/// fails its error is returned and nothing is saved, unless
/// [`StateConfig::save_on_error`] is set.
#[async_trait]
impl Middleware for BotState {
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), TurnError> {
        self.load(ctx, self.config.force_load).await?;

        match next.run(ctx).await {
            Ok(()) => {
                self.save_changes(ctx, false).await?;
                Ok(())
            }
            Err(err) => {
                if self.config.save_on_error {
                    if let Err(save_err) = self.save_changes(ctx, false).await {
                        tracing::warn!(
                            namespace = self.namespace(),
                            error = %save_err,
                            "failed to save state after handler error"
                        );
                    }
                }
                Err(err)
            }
        }
    }
}
