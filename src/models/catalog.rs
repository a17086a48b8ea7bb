//! Static model catalog.

use super::{ModelDescriptor, ToolCallMode};
use std::collections::HashMap;

/// Model used whenever a requested identifier cannot be served.
pub const DEFAULT_MODEL_ID: &str = "google:gemini-2.0-flash";

/// Read-only lookup from `provider:model-name` to descriptor.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelCatalog {
    /// Built-in catalog followed by `extra` entries; later entries replace earlier ones.
    pub fn new(extra: &[ModelDescriptor]) -> Self {
        let mut catalog = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };
        for descriptor in builtin_models().into_iter().chain(extra.iter().cloned()) {
            catalog.insert(descriptor);
        }
        catalog
    }

    fn insert(&mut self, descriptor: ModelDescriptor) {
        let key = descriptor.identifier();
        match self.index.get(&key) {
            Some(&i) => self.entries[i] = descriptor,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(descriptor);
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&ModelDescriptor> {
        self.index.get(identifier).map(|&i| &self.entries[i])
    }

    /// The fallback descriptor. Always present.
    pub fn default_model(&self) -> &ModelDescriptor {
        match self.get(DEFAULT_MODEL_ID) {
            Some(descriptor) => descriptor,
            None => &self.entries[0],
        }
    }

    pub fn entries(&self) -> &[ModelDescriptor] {
        &self.entries
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn builtin_models() -> Vec<ModelDescriptor> {
    use ToolCallMode::{Manual, Native};

    vec![
        ModelDescriptor::new("google", "gemini-2.0-flash", "Gemini 2.0 Flash", "Google Generative AI", Native),
        ModelDescriptor::new("google", "gemini-2.0-flash-thinking-exp-01-21", "Gemini 2.0 Flash Thinking (Exp)", "Google Generative AI", Manual),
        ModelDescriptor::new("google", "gemini-2.5-pro-exp-03-25", "Gemini 2.5 Pro (Exp)", "Google Generative AI", Native),
        ModelDescriptor::new("openai", "gpt-4o-mini", "GPT-4o mini", "OpenAI", Native),
        ModelDescriptor::new("openai", "gpt-4o", "GPT-4o", "OpenAI", Native),
        ModelDescriptor::new("openai", "o3-mini", "o3 mini", "OpenAI", Native),
        ModelDescriptor::new("anthropic", "claude-3-5-sonnet-latest", "Claude 3.5 Sonnet", "Anthropic", Native),
        ModelDescriptor::new("anthropic", "claude-3-7-sonnet-20250219", "Claude 3.7 Sonnet", "Anthropic", Native),
        ModelDescriptor::new("groq", "meta-llama/llama-4-scout-17b-16e-instruct", "Llama 4 Scout", "Groq", Native),
        ModelDescriptor::new("groq", "deepseek-r1-distill-llama-70b", "DeepSeek R1 Distill Llama 70B", "Groq", Manual),
        ModelDescriptor::new("deepseek", "deepseek-chat", "DeepSeek V3", "DeepSeek", Native),
        ModelDescriptor::new("deepseek", "deepseek-reasoner", "DeepSeek R1", "DeepSeek", Manual),
        ModelDescriptor::new("openrouter", "deepseek/deepseek-r1", "DeepSeek R1", "OpenRouter", Manual),
        ModelDescriptor::new("xai", "grok-2-1212", "Grok 2", "xAI", Native),
        ModelDescriptor::new("xai", "grok-2-vision-1212", "Grok 2 Vision", "xAI", Native),
        ModelDescriptor::new("azure", "gpt-4o", "GPT-4o", "Azure", Native),
        ModelDescriptor::new("ollama", "deepseek-r1", "DeepSeek R1", "Ollama", Manual),
        ModelDescriptor::new("ollama", "qwen2.5", "Qwen 2.5", "Ollama", Manual),
    ]
}
