//! The inbound activity: identity fields a turn is processed under.

use crate::id::{ChannelId, ConversationId, UserId};
use serde::{Deserialize, Serialize};

/// The message that started a turn, reduced to what state needs.
///
/// Storage keys are derived from these fields, so they must be stable
/// across turns for the same user or conversation. The connector that
/// produced the activity is outside this crate.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Channel the activity arrived on.
    pub channel_id: ChannelId,
    /// Sender of the activity.
    pub from: UserId,
    /// Conversation the activity belongs to.
    pub conversation: ConversationId,
    /// Message text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Activity {
    /// Create an activity from its identity fields.
    pub fn new(
        channel_id: impl Into<ChannelId>,
        from: impl Into<UserId>,
        conversation: impl Into<ConversationId>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            from: from.into(),
            conversation: conversation.into(),
            text: None,
        }
    }

    /// Attach message text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
