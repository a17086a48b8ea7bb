//! Identifier → callable model resolution.

use super::{
    is_reasoning_model, split_identifier, supports_native_tool_calls, ModelCatalog,
    ModelDescriptor, ProviderConfig, ToolCallMode, DEFAULT_MODEL_ID,
};
use crate::config::Settings;
use crate::error::{ParleyError, Result};
use crate::llm::{LanguageModel, OpenAiChatModel, ReasoningModel};
use crate::openai::create_client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A model ready to generate, with the flags the chat runner branches on.
#[derive(Clone)]
pub struct ResolvedModel {
    pub descriptor: ModelDescriptor,
    pub model: Arc<dyn LanguageModel>,
    pub tool_call_mode: ToolCallMode,
    pub reasoning: bool,
    pub multimodal: bool,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("identifier", &self.descriptor.identifier())
            .field("tool_call_mode", &self.tool_call_mode)
            .field("reasoning", &self.reasoning)
            .field("multimodal", &self.multimodal)
            .finish()
    }
}

/// Catalog plus provider configuration. Shared read-only across requests.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    catalog: ModelCatalog,
    providers: ProviderConfig,
    reasoning_tag: String,
    generation_timeout: Duration,
}

impl ModelRegistry {
    pub fn new(
        catalog: ModelCatalog,
        providers: ProviderConfig,
        reasoning_tag: &str,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            providers,
            reasoning_tag: reasoning_tag.to_string(),
            generation_timeout,
        }
    }

    pub fn from_settings(settings: &Settings, providers: ProviderConfig) -> Self {
        Self::new(
            ModelCatalog::new(&settings.models),
            providers,
            &settings.reasoning.tag_name,
            Duration::from_secs(settings.chat.generation_timeout_seconds),
        )
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn providers(&self) -> &ProviderConfig {
        &self.providers
    }

    /// Catalog entries with `enabled` reflecting provider availability.
    pub fn available_models(&self) -> Vec<ModelDescriptor> {
        self.catalog
            .entries()
            .iter()
            .map(|descriptor| {
                let mut descriptor = descriptor.clone();
                descriptor.enabled =
                    descriptor.enabled && self.providers.is_enabled(&descriptor.provider_id);
                descriptor
            })
            .collect()
    }

    /// Catalog descriptor for `identifier`, falling back to the default model
    /// when the identifier is unknown or its provider is not configured.
    ///
    /// The returned descriptor's tool-call mode is final: a `native` entry
    /// whose provider cannot return structured calls is downgraded here.
    pub fn descriptor_for(&self, identifier: &str) -> ModelDescriptor {
        let descriptor = match self.catalog.get(identifier) {
            Some(descriptor) if self.providers.is_enabled(&descriptor.provider_id) => {
                descriptor.clone()
            }
            Some(_) => {
                warn!(model = %identifier, fallback = DEFAULT_MODEL_ID, "Provider not configured, using default model");
                self.catalog.default_model().clone()
            }
            None => {
                warn!(model = %identifier, fallback = DEFAULT_MODEL_ID, "Unknown model, using default model");
                self.catalog.default_model().clone()
            }
        };
        downgrade_if_needed(descriptor)
    }

    /// Build the callable model for a descriptor.
    pub fn resolve(&self, descriptor: &ModelDescriptor) -> Result<ResolvedModel> {
        let descriptor = downgrade_if_needed(descriptor.clone());
        let identifier = descriptor.identifier();

        let endpoint = self.providers.endpoint(&descriptor.provider_id).ok_or_else(|| {
            ParleyError::Config(format!("provider {} is not configured", descriptor.provider_id))
        })?;

        let client = create_client(&endpoint.api_base, &endpoint.api_key, self.generation_timeout)?;
        let base: Arc<dyn LanguageModel> =
            Arc::new(OpenAiChatModel::new(client, &identifier, &descriptor.id));

        let reasoning = is_reasoning_model(&identifier);
        let model: Arc<dyn LanguageModel> = if reasoning {
            Arc::new(ReasoningModel::new(base, &self.reasoning_tag))
        } else {
            base
        };

        let resolved = ResolvedModel {
            tool_call_mode: descriptor.tool_call_mode,
            multimodal: descriptor.is_multimodal(),
            reasoning,
            model,
            descriptor,
        };
        info!(
            model = %identifier,
            mode = %resolved.tool_call_mode,
            reasoning = resolved.reasoning,
            multimodal = resolved.multimodal,
            "Resolved model"
        );
        Ok(resolved)
    }

    /// Model best suited to drive tool calls on behalf of `identifier`.
    pub fn tool_call_model(&self, identifier: &str) -> String {
        let Some((provider, model)) = split_identifier(identifier) else {
            return DEFAULT_MODEL_ID.to_string();
        };

        if self
            .catalog
            .get(identifier)
            .map(ModelDescriptor::is_multimodal)
            .unwrap_or_else(|| super::is_multimodal_model(model))
        {
            return identifier.to_string();
        }

        match provider {
            "deepseek" => "deepseek:deepseek-chat".to_string(),
            "groq" => "groq:meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            "ollama" => "openai:gpt-4o-mini".to_string(),
            _ => DEFAULT_MODEL_ID.to_string(),
        }
    }
}

fn downgrade_if_needed(mut descriptor: ModelDescriptor) -> ModelDescriptor {
    if descriptor.tool_call_mode == ToolCallMode::Native
        && !supports_native_tool_calls(&descriptor.identifier())
    {
        debug!(model = %descriptor.identifier(), "Provider lacks structured tool calls, using manual mode");
        descriptor.tool_call_mode = ToolCallMode::Manual;
    }
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(providers: ProviderConfig) -> ModelRegistry {
        ModelRegistry::new(
            ModelCatalog::default(),
            providers,
            "think",
            Duration::from_secs(5),
        )
    }

    fn configured() -> ProviderConfig {
        ProviderConfig::default()
            .with_endpoint("google", "http://localhost:1/v1", "g")
            .with_endpoint("openai", "http://localhost:2/v1", "o")
            .with_endpoint("deepseek", "http://localhost:3/v1", "d")
    }

    #[test]
    fn test_unknown_identifier_falls_back_to_default() {
        let registry = registry(configured());
        let descriptor = registry.descriptor_for("openai:gpt-9");
        assert_eq!(descriptor.identifier(), DEFAULT_MODEL_ID);

        let descriptor = registry.descriptor_for("not even an identifier");
        assert_eq!(descriptor.identifier(), DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_unconfigured_provider_falls_back_to_default() {
        let registry = registry(configured());
        let descriptor = registry.descriptor_for("xai:grok-2-1212");
        assert_eq!(descriptor.identifier(), DEFAULT_MODEL_ID);

        let descriptor = registry.descriptor_for("openai:gpt-4o");
        assert_eq!(descriptor.identifier(), "openai:gpt-4o");
    }

    #[test]
    fn test_resolve_flags() {
        let registry = registry(configured());

        let reasoner = registry
            .resolve(&registry.descriptor_for("deepseek:deepseek-reasoner"))
            .unwrap();
        assert!(reasoner.reasoning);
        assert!(!reasoner.multimodal);
        assert_eq!(reasoner.tool_call_mode, ToolCallMode::Manual);
        assert_eq!(reasoner.model.model_id(), "deepseek:deepseek-reasoner");

        let flash = registry
            .resolve(&registry.descriptor_for(DEFAULT_MODEL_ID))
            .unwrap();
        assert!(!flash.reasoning);
        assert!(flash.multimodal);
        assert_eq!(flash.tool_call_mode, ToolCallMode::Native);
    }

    #[test]
    fn test_native_entry_downgraded_when_provider_cannot_call_tools() {
        let registry = registry(configured().with_endpoint("ollama", "http://localhost:11434/v1", "ollama"));
        let mut descriptor =
            ModelDescriptor::new("ollama", "qwen2.5", "Qwen", "Ollama", ToolCallMode::Native);
        descriptor.multimodal = Some(false);

        let resolved = registry.resolve(&descriptor).unwrap();
        assert_eq!(resolved.tool_call_mode, ToolCallMode::Manual);
    }

    #[test]
    fn test_unconfigured_provider_does_not_resolve() {
        let registry = registry(ProviderConfig::default());
        let descriptor = registry.descriptor_for("anything");
        assert_eq!(descriptor.identifier(), DEFAULT_MODEL_ID);

        let err = registry.resolve(&descriptor).unwrap_err();
        assert!(matches!(err, ParleyError::Config(msg) if msg.contains("google")));
    }

    #[test]
    fn test_tool_call_model_mapping() {
        let registry = registry(configured());
        assert_eq!(registry.tool_call_model("google:gemini-2.0-flash"), "google:gemini-2.0-flash");
        assert_eq!(registry.tool_call_model("deepseek:deepseek-reasoner"), "deepseek:deepseek-chat");
        assert_eq!(
            registry.tool_call_model("groq:deepseek-r1-distill-llama-70b"),
            "groq:meta-llama/llama-4-scout-17b-16e-instruct"
        );
        assert_eq!(registry.tool_call_model("ollama:qwen2.5"), "openai:gpt-4o-mini");
        assert_eq!(registry.tool_call_model("openai:gpt-4o-mini"), DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_available_models_reflect_providers() {
        let registry = registry(configured());
        let models = registry.available_models();
        let enabled = |id: &str| models.iter().find(|m| m.identifier() == id).unwrap().enabled;
        assert!(enabled("openai:gpt-4o"));
        assert!(!enabled("anthropic:claude-3-5-sonnet-latest"));
    }
}
