//! HTTP client for an OpenAI-compatible chat-completion API.
//!
//! Behaviour:
//! - `POST {base}/v1/chat/completions` with a bearer credential.
//! - `GET {base}/v1/models`, used only to check that a key is accepted.
//! - Non-2xx responses become [`CompletionError::Api`] carrying the message
//!   from the JSON error body, or `HTTP <status>: <reason>` when there is none.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ChatConfig, DEFAULT_BASE_URL};
use crate::llm::error::{CompletionError, CompletionResult};
use crate::llm::types::{ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ModelList};

/// Path of the chat-completion endpoint, relative to the base URL.
const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";
/// Path of the model-listing endpoint, relative to the base URL.
const MODELS_PATH: &str = "v1/models";

/// Anything able to turn a request into a completion.
///
/// Implemented by [`CompletionClient`]; the session depends on this trait so
/// it can run against other transports.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion request.
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> CompletionResult<ChatCompletionResponse>;
}

/// Async client bound to one API key and base URL.
#[derive(Clone, Debug)]
pub struct CompletionClient {
    http: Client,
    api_key: String,
    base_url: Url,
}

impl CompletionClient {
    /// Create a client for the default API host.
    ///
    /// No I/O happens and the key's shape is not checked.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> CompletionResult<Self> {
        Self::with_config(api_key, &ChatConfig::default())
    }

    /// Create a client using the host and timeouts from `config`.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_config(api_key: impl Into<String>, config: &ChatConfig) -> CompletionResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: normalize_base_url(&config.base_url)?,
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue one chat-completion request.
    ///
    /// The body of a successful response is returned as parsed, without any
    /// check of its shape.
    ///
    /// # Errors
    /// Returns [`CompletionError::Api`] on non-2xx responses, `Transport` when
    /// the request never completes, and `Decode` when the body is not JSON.
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> CompletionResult<ChatCompletionResponse> {
        let url = self.endpoint(CHAT_COMPLETIONS_PATH)?;
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let body = response.bytes().await?;
        let parsed: ChatCompletionResponse = serde_json::from_slice(&body)?;
        if let Some(usage) = parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }
        Ok(parsed)
    }

    /// List the models visible to this key.
    ///
    /// # Errors
    /// Same failure modes as [`Self::create_chat_completion`].
    pub async fn list_models(&self) -> CompletionResult<ModelList> {
        let url = self.endpoint(MODELS_PATH)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn endpoint(&self, path: &str) -> CompletionResult<Url> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> CompletionResult<ChatCompletionResponse> {
        self.create_chat_completion(request).await
    }
}

/// Check a key against the default API host.
///
/// Returns `true` if the model listing succeeds, `false` on any failure.
#[must_use]
pub async fn validate_api_key(api_key: &str) -> bool {
    validate_api_key_with_config(api_key, &ChatConfig::default()).await
}

/// Check a key against the host configured in `config`.
///
/// The failure reason is only logged: a rejected key and an unreachable
/// host both yield `false`.
#[must_use]
pub async fn validate_api_key_with_config(api_key: &str, config: &ChatConfig) -> bool {
    let client = match CompletionClient::with_config(api_key, config) {
        Ok(client) => client,
        Err(e) => {
            warn!("API key validation could not start: {e}");
            return false;
        }
    };

    match client.list_models().await {
        Ok(models) => {
            info!(models = models.data.len(), "API key accepted");
            true
        }
        Err(e) => {
            warn!("API key validation failed: {e}");
            false
        }
    }
}

/// Ensure the base URL ends with `/` so that joining keeps its path prefix.
fn normalize_base_url(raw: &str) -> CompletionResult<Url> {
    let raw = if raw.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        raw.trim()
    };
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pass 2xx responses through; turn anything else into [`CompletionError::Api`].
async fn error_for_status(response: Response) -> CompletionResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            )
        });

    warn!(status = status.as_u16(), "Completion API returned an error: {message}");
    Err(CompletionError::Api {
        status: status.as_u16(),
        message,
    })
}
