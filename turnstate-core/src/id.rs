//! Typed ID wrappers for the identity fields of an inbound activity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed IDs keep a user id from being passed where a conversation id
/// is expected. Channels assign these, so there is no format
/// requirement beyond "not blank" when they are used in a storage key.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the id is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(ChannelId, "Identifier of the channel an activity arrived on.");
typed_id!(UserId, "Identifier of the user who sent an activity.");
typed_id!(ConversationId, "Identifier of the conversation an activity belongs to.");
