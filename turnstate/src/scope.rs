//! Scope strategies: which namespace a state bag caches under and how
//! its storage key is derived.

use turnstate_core::{Activity, StateError, TurnContext};

/// Where one kind of state lives.
///
/// `namespace` names the turn-context cache slot and must be unique per
/// kind of state. `storage_key` is a pure function of the activity's
/// identity; it must return the same key for every turn of the same
/// partition and must not touch storage.
pub trait StateScope: Send + Sync {
    /// Cache slot name inside the turn context.
    fn namespace(&self) -> &str;

    /// Storage key for this turn's partition.
    fn storage_key(&self, ctx: &TurnContext) -> Result<String, StateError>;
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, StateError> {
    if value.trim().is_empty() {
        return Err(StateError::InvalidArgument(format!("{what} is required")));
    }
    Ok(value)
}

fn channel(activity: &Activity) -> Result<&str, StateError> {
    require(activity.channel_id.as_str(), "activity.channel_id")
}

fn user(activity: &Activity) -> Result<&str, StateError> {
    require(activity.from.as_str(), "activity.from")
}

fn conversation(activity: &Activity) -> Result<&str, StateError> {
    require(activity.conversation.as_str(), "activity.conversation")
}

/// State that follows a user across conversations on one channel.
///
/// Key: `user/{channelId}/{userId}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserScope;

impl StateScope for UserScope {
    fn namespace(&self) -> &str {
        "UserState"
    }

    fn storage_key(&self, ctx: &TurnContext) -> Result<String, StateError> {
        let activity = ctx.activity();
        Ok(format!("user/{}/{}", channel(activity)?, user(activity)?))
    }
}

/// State shared by everyone in a conversation.
///
/// Key: `conversation/{channelId}/{conversationId}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationScope;

impl StateScope for ConversationScope {
    fn namespace(&self) -> &str {
        "ConversationState"
    }

    fn storage_key(&self, ctx: &TurnContext) -> Result<String, StateError> {
        let activity = ctx.activity();
        Ok(format!(
            "conversation/{}/{}",
            channel(activity)?,
            conversation(activity)?
        ))
    }
}

/// State for one user within one conversation.
///
/// Key: `{channelId}/conversations/{conversationId}/users/{userId}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateConversationScope;

impl StateScope for PrivateConversationScope {
    fn namespace(&self) -> &str {
        "PrivateConversationState"
    }

    fn storage_key(&self, ctx: &TurnContext) -> Result<String, StateError> {
        let activity = ctx.activity();
        Ok(format!(
            "{}/conversations/{}/users/{}",
            channel(activity)?,
            conversation(activity)?,
            user(activity)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(channel: &str, user: &str, conversation: &str) -> TurnContext {
        TurnContext::new(Activity::new(channel, user, conversation))
    }

    #[test]
    fn user_key() {
        let key = UserScope.storage_key(&ctx("ch1", "u1", "c1")).unwrap();
        assert_eq!(key, "user/ch1/u1");
    }

    #[test]
    fn conversation_key() {
        let key = ConversationScope
            .storage_key(&ctx("ch1", "u1", "c1"))
            .unwrap();
        assert_eq!(key, "conversation/ch1/c1");
    }

    #[test]
    fn private_conversation_key() {
        let key = PrivateConversationScope
            .storage_key(&ctx("ch1", "u1", "c1"))
            .unwrap();
        assert_eq!(key, "ch1/conversations/c1/users/u1");
    }

    #[test]
    fn keys_are_stable_across_turns() {
        let a = UserScope.storage_key(&ctx("ch1", "u1", "c1")).unwrap();
        let b = UserScope.storage_key(&ctx("ch1", "u1", "c2")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn blank_identity_is_invalid() {
        let err = UserScope.storage_key(&ctx("ch1", " ", "c1")).unwrap_err();
        assert!(matches!(err, StateError::InvalidArgument(_)));

        let err = ConversationScope
            .storage_key(&ctx("", "u1", "c1"))
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidArgument(_)));

        let err = PrivateConversationScope
            .storage_key(&ctx("ch1", "u1", ""))
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidArgument(_)));
    }

    #[test]
    fn namespaces_are_distinct() {
        let names = [
            UserScope.namespace(),
            ConversationScope.namespace(),
            PrivateConversationScope.namespace(),
        ];
        assert_ne!(names[0], names[1]);
        assert_ne!(names[1], names[2]);
        assert_ne!(names[0], names[2]);
    }
}
