//! Model catalog and capability resolution.
//!
//! A model is addressed by an identifier of the form `provider:model-name`.
//! The catalog describes which models exist, the provider configuration says
//! which providers are usable, and the registry turns an identifier into a
//! ready-to-call [`LanguageModel`](crate::llm::LanguageModel) plus the
//! capability flags the chat runner branches on.

mod catalog;
mod providers;
mod registry;

pub use catalog::{ModelCatalog, DEFAULT_MODEL_ID};
pub use providers::{ProviderConfig, ProviderEndpoint, PROVIDER_IDS};
pub use registry::{ModelRegistry, ResolvedModel};

use serde::{Deserialize, Serialize};

/// How tool invocations are obtained from a model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallMode {
    /// The provider returns structured tool calls.
    #[default]
    Native,
    /// The model writes `<tool_call>` blocks that Parley parses.
    Manual,
}

impl std::fmt::Display for ToolCallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolCallMode::Native => write!(f, "native"),
            ToolCallMode::Manual => write!(f, "manual"),
        }
    }
}

/// A catalog entry, also the shape of the stored model preference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Model name as the provider knows it.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Provider display name.
    #[serde(default)]
    pub provider: String,
    /// Provider key, e.g. `openai`.
    pub provider_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, rename = "toolCallType")]
    pub tool_call_mode: ToolCallMode,
    /// Explicit multimodal override; the built-in list decides when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multimodal: Option<bool>,
}

fn default_enabled() -> bool {
    true
}

impl ModelDescriptor {
    pub fn new(
        provider_id: &str,
        id: &str,
        name: &str,
        provider: &str,
        tool_call_mode: ToolCallMode,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            provider_id: provider_id.to_string(),
            enabled: true,
            tool_call_mode,
            multimodal: None,
        }
    }

    /// Catalog key: `provider:model-name`.
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.provider_id, self.id)
    }

    /// Whether image and PDF attachments may be forwarded to this model.
    pub fn is_multimodal(&self) -> bool {
        self.multimodal
            .unwrap_or_else(|| is_multimodal_model(&self.id))
    }
}

/// Split `provider:model-name` at the first colon.
///
/// Model names may themselves contain colons (`ollama:qwen2.5:14b`).
pub fn split_identifier(identifier: &str) -> Option<(&str, &str)> {
    let (provider, model) = identifier.split_once(':')?;
    if provider.is_empty() || model.is_empty() {
        return None;
    }
    Some((provider, model))
}

const REASONING_MODEL_FRAGMENTS: &[&str] = &[
    "deepseek-r1",
    "deepseek/deepseek-r1",
    "deepseek-reasoner",
    "o3-mini",
    "gemini-2.5-pro",
    "claude-3-7-sonnet",
];

const MULTIMODAL_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.0-flash-thinking-exp-01-21",
    "gemini-2.5-pro-exp-03-25",
    "claude-3-5-sonnet-latest",
    "grok-2-vision-1212",
];

/// Whether the identifier names a model that emits a thinking segment.
pub fn is_reasoning_model(identifier: &str) -> bool {
    REASONING_MODEL_FRAGMENTS
        .iter()
        .any(|fragment| identifier.contains(fragment))
}

/// Whether the model name accepts image and PDF attachments.
pub fn is_multimodal_model(model_name: &str) -> bool {
    MULTIMODAL_MODELS.contains(&model_name)
}

/// Whether the provider reliably returns structured tool calls for this model.
pub fn supports_native_tool_calls(identifier: &str) -> bool {
    let Some((provider, model)) = split_identifier(identifier) else {
        return false;
    };

    match provider {
        "ollama" => false,
        "openrouter" => !model.contains("deepseek/deepseek-r1"),
        "deepseek" => !model.contains("deepseek-r1") && !model.contains("deepseek-reasoner"),
        _ => true,
    }
}
