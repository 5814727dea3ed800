//! Groups of states that load and save together.

use async_trait::async_trait;
use turnstate_core::{StateError, TurnContext, TurnError};

use crate::bot_state::BotState;
use crate::middleware::{Middleware, Next};

/// An ordered collection of [`BotState`]s.
///
/// Operations run sequentially in insertion order and stop at the first
/// error; states before the failing one keep whatever was done to them.
#[derive(Debug, Clone, Default)]
pub struct BotStateSet {
    states: Vec<BotState>,
}

impl BotStateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, state: BotState) -> Self {
        self.add(state);
        self
    }

    /// Append a state.
    pub fn add(&mut self, state: BotState) -> &mut Self {
        self.states.push(state);
        self
    }

    /// The states in this set.
    pub fn states(&self) -> &[BotState] {
        &self.states
    }

    /// Load every state.
    pub async fn load_all(&self, ctx: &mut TurnContext, force: bool) -> Result<(), StateError> {
        for state in &self.states {
            state.load(ctx, force).await?;
        }
        Ok(())
    }

    /// Save every state that changed (or all of them when forced).
    pub async fn save_all_changes(
        &self,
        ctx: &mut TurnContext,
        force: bool,
    ) -> Result<(), StateError> {
        for state in &self.states {
            state.save_changes(ctx, force).await?;
        }
        Ok(())
    }
}

impl FromIterator<BotState> for BotStateSet {
    fn from_iter<I: IntoIterator<Item = BotState>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

/// Saves every state in a [`BotStateSet`] after the handler succeeds.
///
/// Loading is left to the handler (or to the states' own middleware);
/// states that were never loaded in the turn are skipped on save.
#[derive(Debug, Clone)]
pub struct AutoSaveStateMiddleware {
    states: BotStateSet,
}

impl AutoSaveStateMiddleware {
    /// Wrap a set of states.
    pub fn new(states: BotStateSet) -> Self {
        Self { states }
    }

    /// The wrapped states.
    pub fn states(&self) -> &BotStateSet {
        &self.states
    }
}

#[async_trait]
impl Middleware for AutoSaveStateMiddleware {
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), TurnError> {
        next.run(ctx).await?;
        self.states.save_all_changes(ctx, false).await?;
        Ok(())
    }
}
