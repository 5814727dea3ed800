//! The per-turn context that owns cached state.

use crate::activity::Activity;
use crate::cache::CachedState;
use std::any::Any;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Everything that belongs to a single inbound turn.
///
/// A `TurnContext` is created when an activity arrives and dropped when
/// the turn finishes. It is never shared between turns: the state cache
/// and service bag live here and are reached through `&mut self`.
///
/// Cached state is keyed by scope namespace (`"UserState"`,
/// `"ConversationState"`, ...). An absent entry means "not loaded in
/// this turn" (or evicted after a save).
pub struct TurnContext {
    activity: Activity,
    state_cache: HashMap<String, CachedState>,
    services: HashMap<String, Box<dyn Any + Send + Sync>>,
    cancellation: CancellationToken,
}

impl TurnContext {
    /// Create a context for an inbound activity.
    pub fn new(activity: Activity) -> Self {
        Self {
            activity,
            state_cache: HashMap::new(),
            services: HashMap::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Use a caller-supplied cancellation token for this turn's I/O.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The inbound activity.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Token that aborts pending storage operations when cancelled.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cached state for a namespace, if loaded.
    pub fn cached_state(&self, namespace: &str) -> Option<&CachedState> {
        self.state_cache.get(namespace)
    }

    /// Mutable cached state for a namespace, if loaded.
    pub fn cached_state_mut(&mut self, namespace: &str) -> Option<&mut CachedState> {
        self.state_cache.get_mut(namespace)
    }

    /// Install (or replace) the cached state for a namespace.
    pub fn set_cached_state(&mut self, namespace: impl Into<String>, state: CachedState) {
        self.state_cache.insert(namespace.into(), state);
    }

    /// Drop the cached state for a namespace, returning it.
    pub fn evict_cached_state(&mut self, namespace: &str) -> Option<CachedState> {
        self.state_cache.remove(namespace)
    }

    /// Store an arbitrary per-turn value under `key`, replacing any
    /// previous value.
    pub fn insert_service<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.services.insert(key.into(), Box::new(value));
    }

    /// Look up a per-turn value. Returns `None` if the key is missing or
    /// holds a different type.
    pub fn service<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.services.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutable variant of [`TurnContext::service`].
    pub fn service_mut<T: Any + Send + Sync>(&mut self, key: &str) -> Option<&mut T> {
        self.services.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove a per-turn value.
    pub fn remove_service(&mut self, key: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.services.remove(key)
    }
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("activity", &self.activity)
            .field("cached_namespaces", &self.state_cache.keys().collect::<Vec<_>>())
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TurnContext {
        TurnContext::new(Activity::new("ch1", "u1", "c1"))
    }

    #[test]
    fn cache_slot_lifecycle() {
        let mut ctx = ctx();
        assert!(ctx.cached_state("UserState").is_none());

        ctx.set_cached_state("UserState", CachedState::default());
        assert!(ctx.cached_state("UserState").is_some());
        assert!(ctx.cached_state("ConversationState").is_none());

        assert!(ctx.evict_cached_state("UserState").is_some());
        assert!(ctx.cached_state("UserState").is_none());
    }

    #[test]
    fn services_are_typed() {
        let mut ctx = ctx();
        ctx.insert_service("answer", 42u32);
        assert_eq!(ctx.service::<u32>("answer"), Some(&42));
        assert_eq!(ctx.service::<String>("answer"), None);

        *ctx.service_mut::<u32>("answer").unwrap() += 1;
        assert_eq!(ctx.service::<u32>("answer"), Some(&43));

        assert!(ctx.remove_service("answer").is_some());
        assert_eq!(ctx.service::<u32>("answer"), None);
    }

    #[test]
    fn cancellation_token_is_shared_with_caller() {
        let token = CancellationToken::new();
        let ctx = ctx().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.cancellation_token().is_cancelled());
    }
}
