//! Session object tying the conversation store to a completion backend.
//!
//! Replaces ambient global state: UI handlers hold a [`ChatSession`] (cheap to
//! clone) and every mutation goes through it. The store lock is released while
//! a request is in flight; the reply is settled against the ticket issued with
//! the request, so a response for a deleted, cleared or no-longer-current
//! conversation is dropped instead of landing in whatever is current.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::chat::alerts::format_error_reply;
use crate::chat::ids::{ConversationId, ModelId};
use crate::chat::store::{ConversationStore, DiscardReason, Settlement, StoreOutcome};
use crate::chat::types::{Conversation, Message};
use crate::llm::catalog;
use crate::llm::client::CompletionBackend;
use crate::llm::error::CompletionError;
use crate::llm::types::{DEFAULT_MAX_TOKENS, MessageContent, SamplingOptions};

/// What happened to one send action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum SendOutcome {
    /// The assistant reply was appended.
    Replied {
        /// Conversation that received the reply.
        conversation_id: ConversationId,
    },
    /// The request failed; a warning turn was appended instead.
    Failed {
        /// Conversation that received the warning turn.
        conversation_id: ConversationId,
        /// Text of the warning turn.
        reply: String,
    },
    /// The request settled after its conversation went away.
    Discarded {
        /// Conversation that issued the request.
        conversation_id: ConversationId,
        /// Why the reply was dropped.
        reason: DiscardReason,
    },
    /// Nothing was sent: no conversation is current.
    NoCurrentConversation,
    /// Nothing was sent: no text and no images.
    EmptyInput,
}

/// Conversation state plus the backend used to answer it.
pub struct ChatSession<B: CompletionBackend> {
    store: Arc<RwLock<ConversationStore>>,
    backend: Arc<B>,
    max_tokens: u32,
    sampling: SamplingOptions,
}

impl<B: CompletionBackend> Clone for ChatSession<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
            max_tokens: self.max_tokens,
            sampling: self.sampling,
        }
    }
}

impl<B: CompletionBackend> ChatSession<B> {
    /// New session with an empty store and `selected_model` preselected.
    #[must_use]
    pub fn new(backend: B, selected_model: ModelId) -> Self {
        Self {
            store: Arc::new(RwLock::new(ConversationStore::new(selected_model))),
            backend: Arc::new(backend),
            max_tokens: DEFAULT_MAX_TOKENS,
            sampling: SamplingOptions::default(),
        }
    }

    /// Set the completion token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling parameters forwarded with every request.
    #[must_use]
    pub const fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = sampling;
        self
    }

    /// Shared handle on the underlying store.
    #[must_use]
    pub fn store(&self) -> Arc<RwLock<ConversationStore>> {
        Arc::clone(&self.store)
    }

    /// Snapshot of every conversation, newest first.
    #[must_use]
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.store.read().await.conversations().to_vec()
    }

    /// Snapshot of the current conversation.
    #[must_use]
    pub async fn current(&self) -> Option<Conversation> {
        self.store.read().await.current().cloned()
    }

    /// The globally selected model.
    #[must_use]
    pub async fn selected_model(&self) -> ModelId {
        self.store.read().await.selected_model().clone()
    }

    /// See [`ConversationStore::set_selected_model`].
    pub async fn set_selected_model(&self, model: ModelId) {
        self.store.write().await.set_selected_model(model);
    }

    /// See [`ConversationStore::create_conversation`].
    pub async fn create_conversation(&self) -> ConversationId {
        self.store.write().await.create_conversation()
    }

    /// See [`ConversationStore::add_message`].
    pub async fn add_message(&self, message: Message) -> StoreOutcome {
        self.store.write().await.add_message(message)
    }

    /// See [`ConversationStore::update_last_message`].
    pub async fn update_last_message(&self, content: MessageContent) -> StoreOutcome {
        self.store.write().await.update_last_message(content)
    }

    /// See [`ConversationStore::select_conversation`].
    pub async fn select_conversation(&self, id: ConversationId) -> StoreOutcome {
        self.store.write().await.select_conversation(id)
    }

    /// See [`ConversationStore::delete_conversation`].
    pub async fn delete_conversation(&self, id: ConversationId) -> StoreOutcome {
        self.store.write().await.delete_conversation(id)
    }

    /// See [`ConversationStore::clear_current_conversation`].
    pub async fn clear_current_conversation(&self) -> StoreOutcome {
        self.store.write().await.clear_current_conversation()
    }

    /// Send composer input: append the user turn, run exactly one completion,
    /// then append the reply (or a warning turn) to the issuing conversation.
    pub async fn send_message(&self, text: &str, image_urls: &[String]) -> SendOutcome {
        let Some(content) = MessageContent::from_user_input(text, image_urls) else {
            return SendOutcome::EmptyInput;
        };
        let images = content.image_count();

        let pending = {
            let mut store = self.store.write().await;
            if store.add_message(Message::user(content)) != StoreOutcome::Applied {
                return SendOutcome::NoCurrentConversation;
            }
            let Some(pending) = store.begin_completion(self.max_tokens) else {
                return SendOutcome::NoCurrentConversation;
            };
            pending
        };

        let ticket = pending.ticket;
        let request = pending.request.with_sampling(self.sampling);
        if images > 0 && !catalog::supports_vision(&request.model) {
            warn!(model = %request.model, images, "Sending images to a model without vision support");
        }
        info!(
            request = %ticket.request_id,
            conversation = %ticket.conversation_id,
            model = %request.model,
            "Requesting completion"
        );

        let (reply, failure) = match self.backend.complete(&request).await.and_then(|response| {
            response
                .first_content()
                .map(str::to_owned)
                .ok_or(CompletionError::EmptyResponse)
        }) {
            Ok(text) => (Message::assistant(text), None),
            Err(err) => {
                warn!(request = %ticket.request_id, "Completion failed: {err}");
                let body = format_error_reply(&err);
                (Message::assistant_error(body.clone()), Some(body))
            }
        };

        let settlement = self.store.write().await.settle_completion(&ticket, reply);
        match (settlement, failure) {
            (Settlement::Appended, None) => {
                debug!(request = %ticket.request_id, "Reply appended");
                SendOutcome::Replied {
                    conversation_id: ticket.conversation_id,
                }
            }
            (Settlement::Appended, Some(reply)) => SendOutcome::Failed {
                conversation_id: ticket.conversation_id,
                reply,
            },
            (Settlement::Discarded(reason), _) => {
                warn!(request = %ticket.request_id, "Dropping stale completion: {reason}");
                SendOutcome::Discarded {
                    conversation_id: ticket.conversation_id,
                    reason,
                }
            }
        }
    }
}
