//! Wire types for the chat-completion and model-listing endpoints.
//!
//! Message content types double as the in-memory representation used by the
//! conversation store, so a stored message serializes straight into a request.

use serde::{Deserialize, Serialize};

use crate::chat::ids::ModelId;

/// Default completion token budget sent with every request.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human-authored turn.
    User,
    /// Model-authored turn (including synthetic error turns).
    Assistant,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution hint for image inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Let the service decide.
    Auto,
    /// Low-resolution processing.
    Low,
    /// High-resolution processing.
    High,
}

/// Image reference inside a content part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Remote URL or `data:` URL of the image.
    pub url: String,
    /// Optional resolution hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// One element of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image reference.
    ImageUrl {
        /// Image location and detail hint.
        image_url: ImageUrl,
    },
}

impl ContentPart {
    /// Build a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build an image part without a detail hint.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

/// Message body: either plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body.
    Text(String),
    /// Ordered text and image parts.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Build user content from composer input.
    ///
    /// Produces a part list: the text part first (when the trimmed text is
    /// non-empty), then one image part per URL. Returns `None` when there is
    /// nothing to send.
    #[must_use]
    pub fn from_user_input(text: &str, image_urls: &[String]) -> Option<Self> {
        let text = text.trim();
        let mut parts = Vec::with_capacity(image_urls.len() + 1);
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        parts.extend(image_urls.iter().map(ContentPart::image));

        if parts.is_empty() {
            None
        } else {
            Some(Self::Parts(parts))
        }
    }

    /// First text found in the content, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            }),
        }
    }

    /// Number of image parts.
    #[must_use]
    pub fn image_count(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| matches!(part, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// One message in the request history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: Role,
    /// Body.
    pub content: MessageContent,
}

/// Optional sampling parameters forwarded verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling mass.
    pub top_p: Option<f32>,
    /// Frequency penalty.
    pub frequency_penalty: Option<f32>,
    /// Presence penalty.
    pub presence_penalty: Option<f32>,
}

/// Body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    /// Target model.
    pub model: ModelId,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Completion token budget.
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling mass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Frequency penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl ChatCompletionRequest {
    /// Create a request with the default token budget and no sampling overrides.
    #[must_use]
    pub const fn new(model: ModelId, messages: Vec<ChatMessage>) -> Self {
        Self {
            model,
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    /// Set the completion token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Apply every sampling parameter that is set in `options`.
    #[must_use]
    pub fn with_sampling(mut self, options: SamplingOptions) -> Self {
        if options.temperature.is_some() {
            self.temperature = options.temperature;
        }
        if options.top_p.is_some() {
            self.top_p = options.top_p;
        }
        if options.frequency_penalty.is_some() {
            self.frequency_penalty = options.frequency_penalty;
        }
        if options.presence_penalty.is_some() {
            self.presence_penalty = options.presence_penalty;
        }
        self
    }
}

/// Response of `POST /v1/chat/completions`.
///
/// Parsed leniently: missing fields take their defaults, nothing is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionResponse {
    /// Completion identifier.
    pub id: String,
    /// Object type, normally `chat.completion`.
    pub object: String,
    /// Creation time (seconds since Unix epoch).
    pub created: i64,
    /// Model that produced the completion.
    pub model: String,
    /// Generated choices.
    pub choices: Vec<Choice>,
    /// Token accounting.
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if present.
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// One generated choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Choice {
    /// Position among the choices.
    pub index: u32,
    /// Generated message.
    pub message: ResponseMessage,
    /// Why generation stopped.
    pub finish_reason: Option<String>,
}

/// Message inside a choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseMessage {
    /// Author role as reported by the service.
    pub role: String,
    /// Generated text.
    pub content: Option<String>,
}

/// Token usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens in the completion.
    pub completion_tokens: u64,
    /// Sum of both.
    pub total_tokens: u64,
}

/// Response of `GET /v1/models`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelList {
    /// Object type, normally `list`.
    pub object: String,
    /// Available models.
    pub data: Vec<ModelEntry>,
}

/// One entry of the model listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEntry {
    /// Model identifier.
    pub id: String,
    /// Object type, normally `model`.
    pub object: String,
    /// Creation time (seconds since Unix epoch).
    pub created: i64,
    /// Owning organisation.
    pub owned_by: String,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub(crate) error: ApiErrorDetail,
}

/// Inner error object.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub(crate) message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ModelId {
        ModelId::new("gpt-4o").unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_user_input_text_only_is_single_part() {
        let content = MessageContent::from_user_input("What is 2+2?", &[]);
        assert_eq!(
            content,
            Some(MessageContent::Parts(vec![ContentPart::text("What is 2+2?")]))
        );
    }

    #[test]
    fn test_user_input_with_images_and_empty_input() {
        let images = vec!["data:image/png;base64,AAAA".to_string()];
        let content = MessageContent::from_user_input("  ", &images);
        assert_eq!(
            content,
            Some(MessageContent::Parts(vec![ContentPart::image(
                "data:image/png;base64,AAAA"
            )]))
        );
        assert!(MessageContent::from_user_input("   ", &[]).is_none());
    }

    #[test]
    fn test_first_text() {
        let parts = MessageContent::Parts(vec![
            ContentPart::image("https://example.com/cat.png"),
            ContentPart::text("a cat"),
        ]);
        assert_eq!(parts.first_text(), Some("a cat"));
        assert_eq!(parts.image_count(), 1);
        assert_eq!(MessageContent::from("hi").first_text(), Some("hi"));
        let images_only = MessageContent::Parts(vec![ContentPart::image("u")]);
        assert_eq!(images_only.first_text(), None);
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatCompletionRequest::new(
            model(),
            vec![ChatMessage {
                role: Role::User,
                content: MessageContent::Parts(vec![
                    ContentPart::text("describe"),
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "https://example.com/a.png".to_string(),
                            detail: Some(ImageDetail::Low),
                        },
                    },
                ]),
            }],
        )
        .with_temperature(0.5);

        let value = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "describe"},
                        {"type": "image_url", "image_url": {"url": "https://example.com/a.png", "detail": "low"}}
                    ]
                }],
                "max_tokens": 4096,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn test_sampling_overrides_only_set_fields() {
        let request = ChatCompletionRequest::new(model(), Vec::new())
            .with_temperature(0.2)
            .with_sampling(SamplingOptions {
                top_p: Some(0.9),
                ..SamplingOptions::default()
            });
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.presence_penalty, None);
    }

    #[test]
    fn test_response_parsing_is_lenient() {
        let full = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        });
        let parsed: ChatCompletionResponse = serde_json::from_value(full).unwrap_or_default();
        assert_eq!(parsed.first_content(), Some("4"));
        assert_eq!(parsed.usage.map(|u| u.total_tokens), Some(11));

        let sparse: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": []})).unwrap_or_default();
        assert_eq!(sparse.first_content(), None);
        assert!(sparse.id.is_empty());
    }

    #[test]
    fn test_message_content_round_trips_plain_text() {
        let content: MessageContent = serde_json::from_value(json!("hello"))
            .unwrap_or_else(|_| MessageContent::Parts(Vec::new()));
        assert_eq!(content, MessageContent::Text("hello".to_string()));
    }
}
