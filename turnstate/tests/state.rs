//! Load / save / clear semantics of a single BotState.

use serde_json::json;
use std::sync::Arc;
use turnstate::*;
use turnstate_core::test_utils::InMemoryStorage;
use turnstate_core::{Activity, StateError, TurnContext};

fn ctx() -> TurnContext {
    TurnContext::new(Activity::new("ch1", "u1", "c1"))
}

fn seeded(value: serde_json::Value) -> Arc<InMemoryStorage> {
    Arc::new(InMemoryStorage::new().with_item("user/ch1/u1", value))
}

// --- Load ---

#[tokio::test]
async fn load_reads_once_per_turn() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    state.load(&mut ctx, false).await.unwrap();
    state.load(&mut ctx, false).await.unwrap();

    assert_eq!(storage.read_count(), 1);
    assert!(state.is_loaded(&ctx));
}

#[tokio::test]
async fn forced_load_always_rereads() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let count = state.create_property::<i64>("count").unwrap();
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    count.set(&mut ctx, 10).unwrap();
    state.load(&mut ctx, true).await.unwrap();

    assert_eq!(storage.read_count(), 2);
    // Unsaved local change is discarded by the re-read.
    assert_eq!(count.get(&mut ctx).unwrap(), 3);
}

#[tokio::test]
async fn missing_document_loads_empty() {
    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    assert!(state.is_loaded(&ctx));
    assert!(!state.is_changed(&ctx));
    assert!(ctx.cached_state("UserState").unwrap().document().is_empty());
}

#[tokio::test]
async fn failed_load_leaves_no_cache() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.fail_reads(true);
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    let err = state.load(&mut ctx, false).await.unwrap_err();
    assert!(matches!(err, StateError::Storage(_)));
    assert!(!state.is_loaded(&ctx));
}

#[tokio::test]
async fn blank_identity_fails_before_io() {
    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::user(storage.clone());
    let mut ctx = TurnContext::new(Activity::new("ch1", "", "c1"));

    let err = state.load(&mut ctx, false).await.unwrap_err();
    assert!(matches!(err, StateError::InvalidArgument(_)));
    assert_eq!(storage.read_count(), 0);
}

// --- Save ---

#[tokio::test]
async fn unchanged_save_writes_nothing_and_keeps_cache() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    state.save_changes(&mut ctx, false).await.unwrap();

    assert_eq!(storage.write_count(), 0);
    assert!(state.is_loaded(&ctx));
}

#[tokio::test]
async fn save_without_load_is_noop() {
    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.save_changes(&mut ctx, false).await.unwrap();
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test]
async fn change_writes_full_document_once() {
    let storage = seeded(json!({"count": 3, "name": "ada"}));
    let state = BotState::user(storage.clone());
    let count = state.create_property::<i64>("count").unwrap();
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    count.set(&mut ctx, 4).unwrap();
    state.save_changes(&mut ctx, false).await.unwrap();

    let written = storage.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["user/ch1/u1"], json!({"count": 4, "name": "ada"}));
}

#[tokio::test]
async fn forced_save_writes_unchanged_document() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    state.save_changes(&mut ctx, true).await.unwrap();

    assert_eq!(storage.write_count(), 1);
    assert_eq!(storage.written()[0]["user/ch1/u1"], json!({"count": 3}));
}

#[tokio::test]
async fn forced_save_without_load_writes_empty_document() {
    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.save_changes(&mut ctx, true).await.unwrap();
    assert_eq!(storage.written()[0]["user/ch1/u1"], json!({}));
}

#[tokio::test]
async fn successful_save_evicts_cache() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let count = state.create_property::<i64>("count").unwrap();
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    count.set(&mut ctx, 4).unwrap();
    state.save_changes(&mut ctx, false).await.unwrap();
    assert!(!state.is_loaded(&ctx));

    state.load(&mut ctx, false).await.unwrap();
    assert_eq!(storage.read_count(), 2);
    assert_eq!(count.get(&mut ctx).unwrap(), 4);
}

#[tokio::test]
async fn failed_save_keeps_cache_and_changes() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let count = state.create_property::<i64>("count").unwrap();
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    count.set(&mut ctx, 4).unwrap();
    storage.fail_writes(true);

    let err = state.save_changes(&mut ctx, false).await.unwrap_err();
    assert!(matches!(err, StateError::Storage(_)));
    assert!(state.is_changed(&ctx));

    storage.fail_writes(false);
    state.save_changes(&mut ctx, false).await.unwrap();
    assert_eq!(storage.get("user/ch1/u1"), Some(json!({"count": 4})));
}

// --- Clear ---

#[tokio::test]
async fn clear_then_save_writes_empty_when_previously_non_empty() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    state.clear(&mut ctx);
    state.save_changes(&mut ctx, false).await.unwrap();

    let written = storage.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["user/ch1/u1"], json!({}));
}

#[tokio::test]
async fn clear_then_save_writes_nothing_when_already_empty() {
    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    state.clear(&mut ctx);
    state.save_changes(&mut ctx, false).await.unwrap();

    assert_eq!(storage.write_count(), 0);
}

#[tokio::test]
async fn clear_without_load_does_nothing() {
    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.clear(&mut ctx);
    assert!(!state.is_loaded(&ctx));
    assert_eq!(storage.read_count(), 0);
}

// --- Delete ---

#[tokio::test]
async fn delete_removes_document_and_cache() {
    let storage = seeded(json!({"count": 3}));
    let state = BotState::user(storage.clone());
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    state.delete(&mut ctx).await.unwrap();

    assert!(!state.is_loaded(&ctx));
    assert_eq!(storage.get("user/ch1/u1"), None);
}

// --- Scopes ---

#[tokio::test]
async fn scopes_cache_independently() {
    let storage = Arc::new(InMemoryStorage::new());
    let user = BotState::user(storage.clone());
    let convo = BotState::conversation(storage.clone());
    let topic = convo.create_property::<String>("topic").unwrap();
    let mut ctx = ctx();

    user.load(&mut ctx, false).await.unwrap();
    convo.load(&mut ctx, false).await.unwrap();
    topic.set(&mut ctx, "weather".into()).unwrap();

    assert!(!user.is_changed(&ctx));
    assert!(convo.is_changed(&ctx));

    user.save_changes(&mut ctx, false).await.unwrap();
    convo.save_changes(&mut ctx, false).await.unwrap();

    let written = storage.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["conversation/ch1/c1"], json!({"topic": "weather"}));
}

#[test]
fn custom_scope_with_blank_namespace_is_rejected() {
    struct Blank;
    impl StateScope for Blank {
        fn namespace(&self) -> &str {
            ""
        }
        fn storage_key(&self, _ctx: &TurnContext) -> Result<String, StateError> {
            Ok("k".into())
        }
    }

    let storage = Arc::new(InMemoryStorage::new());
    let err = BotState::new(storage, Blank).unwrap_err();
    assert!(matches!(err, StateError::InvalidArgument(_)));
}

#[tokio::test]
async fn custom_scope_controls_key() {
    struct Global;
    impl StateScope for Global {
        fn namespace(&self) -> &str {
            "GlobalState"
        }
        fn storage_key(&self, _ctx: &TurnContext) -> Result<String, StateError> {
            Ok("global".into())
        }
    }

    let storage = Arc::new(InMemoryStorage::new());
    let state = BotState::new(storage.clone(), Global).unwrap();
    let flag = state.create_property::<bool>("maintenance").unwrap();
    let mut ctx = ctx();

    state.load(&mut ctx, false).await.unwrap();
    flag.set(&mut ctx, true).unwrap();
    state.save_changes(&mut ctx, false).await.unwrap();

    assert_eq!(storage.get("global"), Some(json!({"maintenance": true})));
}
