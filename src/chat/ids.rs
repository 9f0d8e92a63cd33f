// File: src/chat/ids.rs

//! Identifiers used by the conversation store.
//!
//! Conversations and requests get v7 UUIDs so they sort by creation time;
//! messages get random v4 UUIDs. Model names are free-form strings chosen by
//! the remote service, checked only enough to be safe in a JSON body.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident,
        generator = $generator:path
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Fresh identifier.
            #[must_use]
            pub fn new() -> Self {
                Self($generator())
            }

            /// Underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_uuid_id!(
    /// Identifier for a conversation; newer conversations compare greater.
    ConversationId,
    generator = Uuid::now_v7
);

define_uuid_id!(
    /// Identifier for a single message within a conversation.
    MessageId,
    generator = Uuid::new_v4
);

define_uuid_id!(
    /// Correlation id for one outbound completion request, used in logs.
    RequestId,
    generator = Uuid::now_v7
);

/// Why a model name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelIdError {
    /// Nothing left after trimming.
    #[error("model name is empty")]
    Empty,
    /// Longer than [`ModelId::MAX_LEN`] bytes.
    #[error("model name is {len} bytes long (limit {max})")]
    TooLong {
        /// Length of the trimmed input.
        len: usize,
        /// The limit.
        max: usize,
    },
    /// Character outside the accepted set.
    #[error("model name has unexpected character {ch:?} at position {position}")]
    InvalidChar {
        /// Offending character.
        ch: char,
        /// Character position in the trimmed input.
        position: usize,
    },
}

/// Name of a remote chat model, as sent in the request `model` field.
///
/// Accepts what OpenAI-compatible services hand out: `gpt-4o`,
/// `ft:gpt-4o-mini:acme::8fK2`, `meta-llama/Llama-3.1-8B-Instruct`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId(String);

impl ModelId {
    /// Longest accepted name, in bytes.
    pub const MAX_LEN: usize = 192;

    /// Trim and check `raw`.
    ///
    /// # Errors
    /// See [`ModelIdError`].
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ModelIdError> {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            return Err(ModelIdError::Empty);
        }
        if name.len() > Self::MAX_LEN {
            return Err(ModelIdError::TooLong {
                len: name.len(),
                max: Self::MAX_LEN,
            });
        }
        if let Some((position, ch)) = name.chars().enumerate().find(|(_, ch)| !is_model_char(*ch)) {
            return Err(ModelIdError::InvalidChar { ch, position });
        }
        Ok(Self(name.to_owned()))
    }

    /// The name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_model_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | ':' | '/' | '-' | '+' | '@')
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModelId {
    type Err = ModelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ModelId {
    type Error = ModelIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
