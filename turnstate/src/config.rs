//! Configuration for the state middleware stage.

use serde::{Deserialize, Serialize};

/// How a [`BotState`](crate::BotState) behaves when it runs as a
/// middleware stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Re-read from storage on entry even if the turn already has a
    /// cached copy.
    pub force_load: bool,
    /// Attempt to save changes when the downstream handler fails.
    /// The handler's error is still returned.
    pub save_on_error: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            force_load: true,
            save_on_error: false,
        }
    }
}
