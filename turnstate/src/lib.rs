#![deny(missing_docs)]
//! Per-turn scoped state for conversational agents.
//!
//! A [`BotState`] owns one namespace of state (per user, per
//! conversation, ...). At the start of a turn it loads its document from
//! a [`Storage`](turnstate_core::Storage) into the
//! [`TurnContext`](turnstate_core::TurnContext); handlers read and write
//! typed properties through a [`StatePropertyAccessor`]; at the end of
//! the turn the document is written back only if it changed.
//!
//! ```ignore
//! let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
//! let user = BotState::user(storage);
//! let count = user.create_property::<u32>("count")?;
//!
//! let mut pipeline = MiddlewareSet::new();
//! pipeline.add(Arc::new(user.clone()));
//!
//! let handler = handler_fn(move |ctx| {
//!     let count = count.clone();
//!     Box::pin(async move {
//!         let n = count.get(ctx)?;
//!         count.set(ctx, n + 1)?;
//!         Ok(())
//!     })
//! });
//! pipeline.run(&mut ctx, &handler).await?;
//! ```

pub mod accessor;
pub mod bot_state;
pub mod config;
pub mod ext;
pub mod middleware;
pub mod scope;
pub mod state_set;

pub use accessor::StatePropertyAccessor;
pub use bot_state::BotState;
pub use config::StateConfig;
pub use ext::TurnContextStateExt;
pub use middleware::{
    BoxFuture, Middleware, MiddlewareSet, Next, TurnHandler, handler_fn, middleware_fn,
};
pub use scope::{ConversationScope, PrivateConversationScope, StateScope, UserScope};
pub use state_set::{AutoSaveStateMiddleware, BotStateSet};
