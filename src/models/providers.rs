//! Provider availability and endpoints, read once at startup.

use std::collections::HashMap;

/// Every provider key the registry knows how to reach.
pub const PROVIDER_IDS: &[&str] = &[
    "openai",
    "anthropic",
    "google",
    "groq",
    "ollama",
    "azure",
    "deepseek",
    "openai-compatible",
    "openrouter",
    "xai",
];

/// OpenAI-compatible endpoint for one configured provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub api_base: String,
    pub api_key: String,
}

/// Which providers have credentials, and where to reach them.
///
/// Built once from the environment and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    endpoints: HashMap<String, ProviderEndpoint>,
}

impl ProviderConfig {
    /// Read provider credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut endpoints = HashMap::new();

        let mut add = |provider: &str, api_base: Option<String>, api_key: Option<String>| {
            if let (Some(api_base), Some(api_key)) = (api_base, api_key) {
                endpoints.insert(provider.to_string(), ProviderEndpoint { api_base, api_key });
            }
        };

        let fixed = |base: &str| Some(base.to_string());

        add("openai", fixed("https://api.openai.com/v1"), var("OPENAI_API_KEY"));
        add("anthropic", fixed("https://api.anthropic.com/v1"), var("ANTHROPIC_API_KEY"));
        add(
            "google",
            fixed("https://generativelanguage.googleapis.com/v1beta/openai"),
            var("GOOGLE_GENERATIVE_AI_API_KEY"),
        );
        add("groq", fixed("https://api.groq.com/openai/v1"), var("GROQ_API_KEY"));
        add(
            "ollama",
            var("OLLAMA_BASE_URL").map(|base| format!("{}/v1", base.trim_end_matches('/'))),
            Some("ollama".to_string()),
        );
        add(
            "azure",
            var("AZURE_RESOURCE_NAME")
                .map(|resource| format!("https://{}.openai.azure.com/openai/v1", resource)),
            var("AZURE_API_KEY"),
        );
        add("deepseek", fixed("https://api.deepseek.com/v1"), var("DEEPSEEK_API_KEY"));
        add(
            "openai-compatible",
            var("OPENAI_COMPATIBLE_API_BASE_URL"),
            var("OPENAI_COMPATIBLE_API_KEY"),
        );
        add("openrouter", fixed("https://openrouter.ai/api/v1"), var("OPENROUTER_API_KEY"));
        add("xai", fixed("https://api.x.ai/v1"), var("XAI_API_KEY"));

        Self { endpoints }
    }

    /// Whether the provider's required credentials are present.
    pub fn is_enabled(&self, provider_id: &str) -> bool {
        self.endpoints.contains_key(provider_id)
    }

    pub fn endpoint(&self, provider_id: &str) -> Option<&ProviderEndpoint> {
        self.endpoints.get(provider_id)
    }

    /// Register an endpoint directly, bypassing the environment.
    pub fn with_endpoint(mut self, provider_id: &str, api_base: &str, api_key: &str) -> Self {
        self.endpoints.insert(
            provider_id.to_string(),
            ProviderEndpoint {
                api_base: api_base.to_string(),
                api_key: api_key.to_string(),
            },
        );
        self
    }
}
