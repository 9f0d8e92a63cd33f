//! In-memory conversation store.
//!
//! Holds the conversation collection (newest first), the current-conversation
//! pointer and the globally selected model. The current pointer is stored as
//! an identifier, so it can only ever name a conversation that is present in
//! the collection; removing that conversation resets the pointer.
//!
//! Operations that have nothing to act on return a [`StoreOutcome`] describing
//! why they were skipped instead of failing.

use tracing::{debug, info};

use crate::chat::ids::{ConversationId, ModelId, RequestId};
use crate::chat::types::{Conversation, Message, derive_title};
use crate::llm::types::{ChatCompletionRequest, MessageContent, Role};

/// Result of a store mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum StoreOutcome {
    /// The mutation happened.
    Applied,
    /// Skipped: no conversation is current.
    NoCurrentConversation,
    /// Skipped: the current conversation has no messages.
    NoMessages,
    /// Skipped: no conversation has the given identifier.
    UnknownConversation,
}

impl StoreOutcome {
    /// Whether the mutation happened.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Tag carried by an in-flight completion request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionTicket {
    /// Correlation identifier for logs.
    pub request_id: RequestId,
    /// Conversation that issued the request.
    pub conversation_id: ConversationId,
    generation: u64,
}

/// A request ready to be sent, with the ticket to settle it.
#[derive(Clone, Debug)]
pub struct PendingCompletion {
    /// Settlement tag.
    pub ticket: CompletionTicket,
    /// Request built from the conversation history.
    pub request: ChatCompletionRequest,
}

/// Why a settled completion was not appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// The issuing conversation was deleted.
    ConversationDeleted,
    /// Another conversation (or none) is current.
    ConversationNotCurrent,
    /// The issuing conversation was cleared.
    ConversationCleared,
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConversationDeleted => write!(f, "conversation deleted"),
            Self::ConversationNotCurrent => write!(f, "conversation no longer current"),
            Self::ConversationCleared => write!(f, "conversation cleared"),
        }
    }
}

/// Result of settling a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum Settlement {
    /// The reply was appended to the issuing conversation.
    Appended,
    /// The reply was dropped.
    Discarded(DiscardReason),
}

/// Conversation collection plus current pointer and selected model.
#[derive(Clone, Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current: Option<ConversationId>,
    selected_model: ModelId,
}

impl ConversationStore {
    /// Empty store with `selected_model` preselected.
    #[must_use]
    pub const fn new(selected_model: ModelId) -> Self {
        Self {
            conversations: Vec::new(),
            current: None,
            selected_model,
        }
    }

    /// All conversations, newest first.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Number of conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether there are no conversations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Look up a conversation.
    #[must_use]
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Identifier of the current conversation.
    #[must_use]
    pub const fn current_id(&self) -> Option<ConversationId> {
        self.current
    }

    /// The current conversation.
    #[must_use]
    pub fn current(&self) -> Option<&Conversation> {
        self.current.and_then(|id| self.get(id))
    }

    /// Model new conversations are tagged with.
    #[must_use]
    pub const fn selected_model(&self) -> &ModelId {
        &self.selected_model
    }

    /// Change the selected model.
    ///
    /// The current conversation is retagged so its next request goes to
    /// `model`; other conversations keep their own model.
    pub fn set_selected_model(&mut self, model: ModelId) {
        if let Some(conversation) = self.current_mut() {
            conversation.model = model.clone();
        }
        debug!(model = %model, "Selected model changed");
        self.selected_model = model;
    }

    /// Insert an empty conversation at the head and make it current.
    pub fn create_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::new(self.selected_model.clone());
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        self.current = Some(id);
        info!(conversation = %id, model = %self.selected_model, "Created conversation");
        id
    }

    /// Append to the current conversation.
    ///
    /// The first message, when user-authored, sets the title.
    pub fn add_message(&mut self, message: Message) -> StoreOutcome {
        let Some(conversation) = self.current_mut() else {
            debug!("add_message skipped: no current conversation");
            return StoreOutcome::NoCurrentConversation;
        };

        if conversation.messages.is_empty() && message.role() == Role::User {
            conversation.title = derive_title(&message.content);
        }
        conversation.messages.push(message);
        StoreOutcome::Applied
    }

    /// Replace the content of the current conversation's last message.
    ///
    /// Identifier and role of that message are kept; the title is not touched.
    pub fn update_last_message(&mut self, content: MessageContent) -> StoreOutcome {
        let Some(conversation) = self.current_mut() else {
            return StoreOutcome::NoCurrentConversation;
        };
        let Some(last) = conversation.messages.last_mut() else {
            return StoreOutcome::NoMessages;
        };
        last.content = content;
        StoreOutcome::Applied
    }

    /// Make `id` current and adopt its model as the selected model.
    pub fn select_conversation(&mut self, id: ConversationId) -> StoreOutcome {
        let Some(model) = self.get(id).map(|c| c.model.clone()) else {
            debug!(conversation = %id, "select skipped: unknown conversation");
            return StoreOutcome::UnknownConversation;
        };
        self.current = Some(id);
        self.selected_model = model;
        StoreOutcome::Applied
    }

    /// Remove `id`; clears the current pointer if it was current.
    ///
    /// Another conversation is never selected in its place.
    pub fn delete_conversation(&mut self, id: ConversationId) -> StoreOutcome {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.current == Some(id) {
            self.current = None;
        }

        if self.conversations.len() == before {
            StoreOutcome::UnknownConversation
        } else {
            info!(conversation = %id, "Deleted conversation");
            StoreOutcome::Applied
        }
    }

    /// Empty the current conversation and reset its title.
    ///
    /// Identifier and model are kept.
    pub fn clear_current_conversation(&mut self) -> StoreOutcome {
        let Some(conversation) = self.current_mut() else {
            return StoreOutcome::NoCurrentConversation;
        };
        conversation.reset();
        StoreOutcome::Applied
    }

    /// Build the request for the current conversation and tag it.
    ///
    /// Returns `None` when there is no current conversation.
    #[must_use]
    pub fn begin_completion(&self, max_tokens: u32) -> Option<PendingCompletion> {
        let conversation = self.current()?;
        let ticket = CompletionTicket {
            request_id: RequestId::new(),
            conversation_id: conversation.id,
            generation: conversation.generation,
        };
        let request = ChatCompletionRequest::new(conversation.model.clone(), conversation.history())
            .with_max_tokens(max_tokens);
        Some(PendingCompletion { ticket, request })
    }

    /// Append `reply` if the ticket's conversation still exists, is still
    /// current and has not been cleared since the request was issued.
    pub fn settle_completion(&mut self, ticket: &CompletionTicket, reply: Message) -> Settlement {
        let Some(conversation) = self.get(ticket.conversation_id) else {
            return Settlement::Discarded(DiscardReason::ConversationDeleted);
        };
        if conversation.generation != ticket.generation {
            return Settlement::Discarded(DiscardReason::ConversationCleared);
        }
        if self.current != Some(ticket.conversation_id) {
            return Settlement::Discarded(DiscardReason::ConversationNotCurrent);
        }

        match self.add_message(reply) {
            StoreOutcome::Applied => Settlement::Appended,
            _ => Settlement::Discarded(DiscardReason::ConversationNotCurrent),
        }
    }

    fn current_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::{IMAGE_TITLE, NEW_CHAT_TITLE};
    use crate::llm::types::ContentPart;

    fn model(id: &str) -> ModelId {
        ModelId::new(id).unwrap_or_else(|_| unreachable!())
    }

    fn store() -> ConversationStore {
        ConversationStore::new(model("gpt-4o"))
    }

    fn user_text(text: &str) -> Message {
        Message::user(MessageContent::Parts(vec![ContentPart::text(text)]))
    }

    #[test]
    fn test_create_conversation() {
        let mut store = store();
        let first = store.create_conversation();
        store.set_selected_model(model("gpt-4o-mini"));
        let second = store.create_conversation();

        assert_eq!(store.len(), 2);
        assert_eq!(store.conversations()[0].id, second);
        assert_eq!(store.conversations()[1].id, first);
        assert_eq!(store.current_id(), Some(second));

        let current = store.current().unwrap_or_else(|| unreachable!());
        assert!(current.is_empty());
        assert_eq!(current.title, NEW_CHAT_TITLE);
        assert_eq!(current.model.as_str(), "gpt-4o-mini");
    }

    #[test]
    fn test_add_message_without_current_is_skipped() {
        let mut store = store();
        assert_eq!(
            store.add_message(user_text("hello")),
            StoreOutcome::NoCurrentConversation
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_title_comes_from_first_user_message() {
        let mut store = store();
        store.create_conversation();

        assert!(store.add_message(user_text("What is 2+2?")).is_applied());
        assert!(store.add_message(Message::assistant("4")).is_applied());
        assert!(store.add_message(user_text("And 3+3?")).is_applied());

        let current = store.current().unwrap_or_else(|| unreachable!());
        assert_eq!(current.title, "What is 2+2?");
        assert_eq!(current.messages.len(), 3);
        assert_eq!(
            current.messages[0].content,
            MessageContent::Parts(vec![ContentPart::text("What is 2+2?")])
        );
    }

    #[test]
    fn test_title_ignores_assistant_first_message() {
        let mut store = store();
        store.create_conversation();

        assert!(store.add_message(Message::assistant("Welcome!")).is_applied());
        assert!(store.add_message(user_text("hi")).is_applied());

        let current = store.current().unwrap_or_else(|| unreachable!());
        assert_eq!(current.title, NEW_CHAT_TITLE);
    }

    #[test]
    fn test_title_for_image_only_message() {
        let mut store = store();
        store.create_conversation();
        let images = vec!["https://example.com/a.png".to_string()];
        let content = MessageContent::from_user_input("", &images).unwrap_or_else(|| unreachable!());

        assert!(store.add_message(Message::user(content)).is_applied());
        let current = store.current().unwrap_or_else(|| unreachable!());
        assert_eq!(current.title, IMAGE_TITLE);
    }

    #[test]
    fn test_update_last_message() {
        let mut store = store();
        assert_eq!(
            store.update_last_message("x".into()),
            StoreOutcome::NoCurrentConversation
        );

        store.create_conversation();
        assert_eq!(store.update_last_message("x".into()), StoreOutcome::NoMessages);

        assert!(store.add_message(user_text("original")).is_applied());
        let before = store
            .current()
            .and_then(|c| c.last_message())
            .cloned()
            .unwrap_or_else(|| unreachable!());

        assert!(store.update_last_message("patched".into()).is_applied());
        let after_first = store.current().cloned().unwrap_or_else(|| unreachable!());
        assert!(store.update_last_message("patched".into()).is_applied());
        let after_second = store.current().cloned().unwrap_or_else(|| unreachable!());

        assert_eq!(after_first, after_second);
        let last = after_second.last_message().unwrap_or_else(|| unreachable!());
        assert_eq!(last.id, before.id);
        assert_eq!(last.role(), Role::User);
        assert_eq!(last.text(), Some("patched"));
        assert_eq!(after_second.title, "original");
    }

    #[test]
    fn test_select_adopts_conversation_model() {
        let mut store = store();
        let first = store.create_conversation();
        store.set_selected_model(model("gpt-4o-mini"));
        let second = store.create_conversation();
        assert_eq!(store.current_id(), Some(second));

        assert!(store.select_conversation(first).is_applied());
        assert_eq!(store.current_id(), Some(first));
        assert_eq!(store.selected_model().as_str(), "gpt-4o");

        assert_eq!(
            store.select_conversation(ConversationId::new()),
            StoreOutcome::UnknownConversation
        );
        assert_eq!(store.current_id(), Some(first));
    }

    #[test]
    fn test_selected_model_retags_current_conversation() {
        let mut store = store();
        let other = store.create_conversation();
        let current = store.create_conversation();
        store.set_selected_model(model("gpt-4o-mini"));
        assert_eq!(
            store.current().map(|c| c.model.as_str().to_string()),
            Some("gpt-4o-mini".to_string())
        );

        assert!(store.add_message(user_text("hi")).is_applied());
        store.set_selected_model(model("gpt-4-turbo"));
        assert_eq!(
            store.get(current).map(|c| c.model.as_str().to_string()),
            Some("gpt-4-turbo".to_string())
        );
        assert_eq!(
            store.get(other).map(|c| c.model.as_str().to_string()),
            Some("gpt-4o".to_string())
        );

        let pending = store.begin_completion(4096);
        assert_eq!(
            pending.map(|p| p.request.model.as_str().to_string()),
            Some("gpt-4-turbo".to_string())
        );
    }

    #[test]
    fn test_delete_current_clears_pointer() {
        let mut store = store();
        let keep = store.create_conversation();
        let doomed = store.create_conversation();

        assert!(store.delete_conversation(doomed).is_applied());
        assert_eq!(store.current_id(), None);
        assert!(store.get(doomed).is_none());
        assert!(store.get(keep).is_some());

        assert_eq!(
            store.select_conversation(doomed),
            StoreOutcome::UnknownConversation
        );
        assert_eq!(store.current_id(), None);
        assert_eq!(
            store.delete_conversation(doomed),
            StoreOutcome::UnknownConversation
        );
    }

    #[test]
    fn test_delete_other_keeps_current() {
        let mut store = store();
        let other = store.create_conversation();
        let current = store.create_conversation();

        assert!(store.delete_conversation(other).is_applied());
        assert_eq!(store.current_id(), Some(current));
    }

    #[test]
    fn test_clear_current_conversation() {
        let mut store = store();
        assert_eq!(
            store.clear_current_conversation(),
            StoreOutcome::NoCurrentConversation
        );

        store.set_selected_model(model("gpt-4o-mini"));
        let id = store.create_conversation();
        assert!(store.add_message(user_text("hello there")).is_applied());
        assert!(store.clear_current_conversation().is_applied());

        let current = store.current().unwrap_or_else(|| unreachable!());
        assert_eq!(current.id, id);
        assert!(current.is_empty());
        assert_eq!(current.title, NEW_CHAT_TITLE);
        assert_eq!(current.model.as_str(), "gpt-4o-mini");

        assert!(store.add_message(user_text("fresh start")).is_applied());
        assert_eq!(
            store.current().map(|c| c.title.as_str()),
            Some("fresh start")
        );
    }

    #[test]
    fn test_begin_completion_builds_request() {
        let mut store = store();
        assert!(store.begin_completion(4096).is_none());

        let id = store.create_conversation();
        assert!(store.add_message(user_text("hi")).is_applied());
        assert!(store.add_message(Message::assistant_error("⚠️ boom")).is_applied());
        assert!(store.add_message(user_text("retry")).is_applied());

        let pending = store.begin_completion(512).unwrap_or_else(|| unreachable!());
        assert_eq!(pending.ticket.conversation_id, id);
        assert_eq!(pending.request.max_tokens, 512);
        assert_eq!(pending.request.model.as_str(), "gpt-4o");
        assert_eq!(pending.request.messages.len(), 2);
    }

    #[test]
    fn test_settle_appends_to_issuing_conversation() {
        let mut store = store();
        store.create_conversation();
        assert!(store.add_message(user_text("hi")).is_applied());
        let pending = store.begin_completion(4096).unwrap_or_else(|| unreachable!());

        let settlement = store.settle_completion(&pending.ticket, Message::assistant("hello"));
        assert_eq!(settlement, Settlement::Appended);
        let current = store.current().unwrap_or_else(|| unreachable!());
        assert_eq!(current.messages.len(), 2);
        assert_eq!(current.messages[1].role(), Role::Assistant);
    }

    #[test]
    fn test_settle_discards_after_switch() {
        let mut store = store();
        let issuing = store.create_conversation();
        assert!(store.add_message(user_text("hi")).is_applied());
        let pending = store.begin_completion(4096).unwrap_or_else(|| unreachable!());

        let other = store.create_conversation();
        let settlement = store.settle_completion(&pending.ticket, Message::assistant("late"));
        assert_eq!(
            settlement,
            Settlement::Discarded(DiscardReason::ConversationNotCurrent)
        );
        assert!(store.get(other).is_some_and(Conversation::is_empty));
        assert_eq!(store.get(issuing).map(|c| c.messages.len()), Some(1));
    }

    #[test]
    fn test_settle_discards_after_delete() {
        let mut store = store();
        let issuing = store.create_conversation();
        assert!(store.add_message(user_text("hi")).is_applied());
        let pending = store.begin_completion(4096).unwrap_or_else(|| unreachable!());

        assert!(store.delete_conversation(issuing).is_applied());
        let settlement = store.settle_completion(&pending.ticket, Message::assistant("late"));
        assert_eq!(
            settlement,
            Settlement::Discarded(DiscardReason::ConversationDeleted)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_settle_discards_after_clear() {
        let mut store = store();
        store.create_conversation();
        assert!(store.add_message(user_text("hi")).is_applied());
        let pending = store.begin_completion(4096).unwrap_or_else(|| unreachable!());

        assert!(store.clear_current_conversation().is_applied());
        let settlement = store.settle_completion(&pending.ticket, Message::assistant("late"));
        assert_eq!(
            settlement,
            Settlement::Discarded(DiscardReason::ConversationCleared)
        );
        assert!(store.current().is_some_and(Conversation::is_empty));
    }
}
