//! Models offered in the model selector.

use crate::chat::ids::ModelId;

/// Model selected when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// One selectable model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelOption {
    /// Identifier sent in the `model` field.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether the model accepts image parts.
    pub supports_vision: bool,
}

/// Models known to the selector, in display order.
pub const AVAILABLE_MODELS: &[ModelOption] = &[
    ModelOption {
        id: "gpt-4o",
        name: "GPT-4o",
        supports_vision: true,
    },
    ModelOption {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        supports_vision: true,
    },
    ModelOption {
        id: "gpt-4-turbo",
        name: "GPT-4 Turbo",
        supports_vision: true,
    },
    ModelOption {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        supports_vision: false,
    },
];

/// Look up a catalog entry.
#[must_use]
pub fn find_model(id: &str) -> Option<&'static ModelOption> {
    AVAILABLE_MODELS.iter().find(|option| option.id == id)
}

/// Whether `model` can take image input. Models outside the catalog are
/// assumed capable and left for the service to reject.
#[must_use]
pub fn supports_vision(model: &ModelId) -> bool {
    find_model(model.as_str()).is_none_or(|option| option.supports_vision)
}

/// Display name for `model`, falling back to the raw identifier.
#[must_use]
pub fn display_name(model: &ModelId) -> &str {
    find_model(model.as_str()).map_or_else(|| model.as_str(), |option| option.name)
}
