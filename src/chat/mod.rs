//! Conversation state for the chat client.
//!
//! - `ids`: identifier newtypes and the validated model id
//! - `types`: conversations, messages and title derivation
//! - `store`: the in-memory conversation store
//! - `session`: the store wired to a completion backend, with stale-reply fencing
//! - `alerts`: user-facing text for failed completions

pub mod alerts;
pub mod ids;
pub mod session;
pub mod store;
pub mod types;

pub use alerts::{FailureKind, WARNING_GLYPH, format_error_reply, user_facing_message};
pub use ids::{ConversationId, MessageId, ModelId, ModelIdError, RequestId};
pub use session::{ChatSession, SendOutcome};
pub use store::{
    CompletionTicket, ConversationStore, DiscardReason, PendingCompletion, Settlement,
    StoreOutcome,
};
pub use types::{Conversation, Message, NEW_CHAT_TITLE, derive_title};
