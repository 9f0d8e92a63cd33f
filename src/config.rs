//! Configuration for the chat client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::chat::ids::{ModelId, ModelIdError};
use crate::llm::catalog::DEFAULT_MODEL;
use crate::llm::types::DEFAULT_MAX_TOKENS;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Environment variable overriding the API host (e.g. a local proxy).
pub const BASE_URL_ENV: &str = "POCKETCHAT_BASE_URL";
/// Environment variable overriding the initially selected model.
pub const MODEL_ENV: &str = "POCKETCHAT_MODEL";
/// Environment variable overriding the credential file location.
pub const CREDENTIALS_ENV: &str = "POCKETCHAT_CREDENTIALS";

/// Errors raised by [`ChatConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Base URL does not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    /// Base URL is not `http` or `https`.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// Default model identifier is malformed.
    #[error("invalid default model: {0}")]
    InvalidModel(#[from] ModelIdError),
    /// Numeric setting out of range.
    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

/// Configuration for the completion client and session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// API host; `/v1/...` paths are appended to it.
    pub base_url: String,
    /// Model selected when the session starts.
    pub default_model: String,
    /// Completion token budget per request.
    pub max_tokens: u32,
    /// Whole-request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Where the API key is persisted.
    pub credentials_path: PathBuf,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            credentials_path: default_credentials_path(),
        }
    }
}

impl ChatConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `POCKETCHAT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            config.default_model = model;
        }
        if let Some(path) = std::env::var_os(CREDENTIALS_ENV) {
            config.credentials_path = PathBuf::from(path);
        }
        config
    }

    /// Set the API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the initially selected model.
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the completion token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the credential file location.
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Parsed API host.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or is not http(s).
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Parsed default model.
    ///
    /// # Errors
    /// Returns an error if the identifier is malformed.
    pub fn default_model_id(&self) -> Result<ModelId, ConfigError> {
        Ok(ModelId::new(&self.default_model)?)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;
        self.default_model_id()?;

        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue(
                "max_tokens must be > 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "request_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// `$HOME/.pocketchat/credentials.json`, or a relative path without `HOME`.
fn default_credentials_path() -> PathBuf {
    let base = std::env::var_os("HOME").map_or_else(PathBuf::new, PathBuf::from);
    base.join(".pocketchat").join("credentials.json")
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
