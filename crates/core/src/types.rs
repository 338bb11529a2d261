use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier for a message within a session.
pub type MessageId = String;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Provider-facing role tag for this sender.
    pub fn as_role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "model",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// One entry in a chat session.
///
/// `text` is mutable while the reply is still streaming in; once the turn
/// reaches a terminal state the record is left untouched until the session
/// is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
}

impl Message {
    /// Create a user message with a fresh id.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender: Sender::User,
        }
    }

    /// Create a bot message with a fresh id.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender: Sender::Bot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_roles_match_provider_tags() {
        assert_eq!(Sender::User.as_role(), "user");
        assert_eq!(Sender::Bot.as_role(), "model");
    }

    #[test]
    fn messages_get_distinct_ids() {
        let a = Message::user("hello");
        let b = Message::user("hello");
        assert_ne!(a.id, b.id);
        assert_eq!(a.sender, Sender::User);
    }

    #[test]
    fn message_serialization_round_trip() {
        let msg = Message::bot("How can I help?");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"bot\""));
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.text, "How can I help?");
        assert_eq!(parsed.sender, Sender::Bot);
    }
}
