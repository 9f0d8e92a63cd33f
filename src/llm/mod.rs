//! Completion client for an OpenAI-compatible REST API.
//!
//! - `types`: request/response wire types and message content
//! - `client`: the HTTP client, the backend trait, and key validation
//! - `error`: the single error channel for remote calls
//! - `catalog`: models offered in the model selector

pub mod catalog;
pub mod client;
pub mod error;
pub mod types;

pub use client::{CompletionBackend, CompletionClient, validate_api_key, validate_api_key_with_config};
pub use error::{CompletionError, CompletionResult};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, ImageDetail,
    ImageUrl, MessageContent, ModelList, Role, SamplingOptions,
};
