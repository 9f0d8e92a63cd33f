//! Conversation and message types held by the store.

use serde::{Deserialize, Serialize};

use crate::chat::ids::{ConversationId, MessageId, ModelId};
use crate::llm::types::{ChatMessage, MessageContent, Role};

/// Title of a conversation before its first user message.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Title used when the first user message carries no text.
pub const IMAGE_TITLE: &str = "Image";

/// Titles longer than this many characters are truncated.
pub const TITLE_MAX_CHARS: usize = 30;

/// Appended to truncated titles.
const TITLE_ELLIPSIS: &str = "...";

/// One turn in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Author; fixed at creation.
    role: Role,
    /// Body; may be replaced wholesale.
    pub content: MessageContent,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: i64,
    /// Synthetic assistant turn reporting a failed completion.
    pub is_error: bool,
}

impl Message {
    fn with_role(role: Role, content: MessageContent, is_error: bool) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            created_at: chrono::Utc::now().timestamp_millis(),
            is_error,
        }
    }

    /// A user-authored message.
    #[must_use]
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::with_role(Role::User, content.into(), false)
    }

    /// An assistant reply.
    #[must_use]
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::with_role(Role::Assistant, content.into(), false)
    }

    /// An assistant-role message describing a failed completion.
    #[must_use]
    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, MessageContent::Text(text.into()), true)
    }

    /// Author of the message.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// First text of the message, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.first_text()
    }

    /// Request-history form of the message.
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A titled, ordered sequence of messages bound to a model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique, creation-time-ordered identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Messages in chronological order.
    pub messages: Vec<Message>,
    /// Model used for completions in this conversation.
    pub model: ModelId,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: i64,
    /// Bumped every time the conversation is cleared.
    pub(crate) generation: u64,
}

impl Conversation {
    /// An empty conversation titled "New Chat".
    #[must_use]
    pub fn new(model: ModelId) -> Self {
        Self {
            id: ConversationId::new(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            model,
            created_at: chrono::Utc::now().timestamp_millis(),
            generation: 0,
        }
    }

    /// Whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// History to send upstream; synthetic error turns are left out.
    #[must_use]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|message| !message.is_error)
            .map(Message::to_chat_message)
            .collect()
    }

    /// Drop every message and reset the title.
    pub(crate) fn reset(&mut self) {
        self.messages.clear();
        self.title = NEW_CHAT_TITLE.to_string();
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Title derived from the first user message.
///
/// Uses the first text of `content`; more than [`TITLE_MAX_CHARS`] characters
/// are cut and suffixed with `...`. Content without text yields "Image".
#[must_use]
pub fn derive_title(content: &MessageContent) -> String {
    let Some(text) = content.first_text() else {
        return IMAGE_TITLE.to_string();
    };

    if text.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str(TITLE_ELLIPSIS);
        title
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ContentPart;

    fn model() -> ModelId {
        ModelId::new("gpt-4o").unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_new_conversation_is_empty() {
        let conversation = Conversation::new(model());
        assert!(conversation.is_empty());
        assert_eq!(conversation.title, NEW_CHAT_TITLE);
        assert_eq!(conversation.model.as_str(), "gpt-4o");
        assert!(conversation.last_message().is_none());
    }

    #[test]
    fn test_derive_title_short_text() {
        let content = MessageContent::Parts(vec![ContentPart::text("What is 2+2?")]);
        assert_eq!(derive_title(&content), "What is 2+2?");
    }

    #[test]
    fn test_derive_title_truncates_long_text() {
        let exactly = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&MessageContent::from(exactly.as_str())), exactly);

        let long = "Explain the borrow checker to me like I am five years old";
        let title = derive_title(&MessageContent::from(long));
        assert_eq!(title, "Explain the borrow checker to ...");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_derive_title_counts_characters_not_bytes() {
        let text = "é".repeat(31);
        let title = derive_title(&MessageContent::from(text.as_str()));
        assert_eq!(title, format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_derive_title_image_only() {
        let content = MessageContent::Parts(vec![ContentPart::image("https://example.com/a.png")]);
        assert_eq!(derive_title(&content), IMAGE_TITLE);
    }

    #[test]
    fn test_history_skips_error_turns() {
        let mut conversation = Conversation::new(model());
        conversation.messages.push(Message::user("hi"));
        conversation
            .messages
            .push(Message::assistant_error("⚠️ Rate limit exceeded"));
        conversation.messages.push(Message::user("hi again"));

        let history = conversation.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|message| message.role == Role::User));
    }

    #[test]
    fn test_reset_bumps_generation() {
        let mut conversation = Conversation::new(model());
        conversation.messages.push(Message::user("hi"));
        conversation.title = "hi".to_string();
        conversation.reset();
        assert!(conversation.is_empty());
        assert_eq!(conversation.title, NEW_CHAT_TITLE);
        assert_eq!(conversation.generation, 1);
    }
}
