//! Configuration settings for Parley.

use crate::models::ModelDescriptor;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub server: ServerSettings,
    pub chat: ChatSettings,
    pub reasoning: ReasoningSettings,
    pub tools: ToolSettings,
    pub prompts: PromptSettings,
    /// Extra catalog entries appended to the built-in model list.
    pub models: Vec<ModelDescriptor>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Chat orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Hard ceiling on the whole request, tool rounds included.
    pub request_timeout_seconds: u64,
    /// Timeout for a single generation call.
    pub generation_timeout_seconds: u64,
    /// Model invocations allowed when search mode is on.
    pub search_step_budget: usize,
    /// Model invocations allowed when search mode is off.
    pub default_step_budget: usize,
    /// Sampling temperature forwarded to providers, if set.
    pub temperature: Option<f32>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 400,
            generation_timeout_seconds: crate::openai::DEFAULT_TIMEOUT_SECS,
            search_step_budget: 5,
            default_step_budget: 1,
            temperature: None,
        }
    }
}

impl ChatSettings {
    /// Step budget for a request with the given search mode.
    pub fn step_budget(&self, search_mode: bool) -> usize {
        let budget = if search_mode {
            self.search_step_budget
        } else {
            self.default_step_budget
        };
        budget.max(1)
    }
}

/// Reasoning-model decorator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    /// Tag whose content is treated as the model's thinking segment.
    pub tag_name: String,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            tag_name: "think".to_string(),
        }
    }
}

/// Credentials and limits for the built-in tools.
///
/// Keys left unset here are read from `TAVILY_API_KEY`, `SERPER_API_KEY`
/// and `JINA_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub tavily_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub jina_api_key: Option<String>,
    /// Result count used when the model does not ask for one.
    pub search_max_results: u32,
    /// Tavily search depth (basic, advanced).
    pub search_depth: String,
    /// Retrieved pages are cut to this many characters.
    pub retrieve_max_chars: usize,
    /// Timeout for a single tool HTTP call.
    pub timeout_seconds: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            serper_api_key: None,
            jina_api_key: None,
            search_max_results: 10,
            search_depth: "basic".to_string(),
            retrieve_max_chars: 20_000,
            timeout_seconds: 30,
        }
    }
}

impl ToolSettings {
    /// Fill unset keys from the environment.
    pub fn with_env_fallback(mut self) -> Self {
        fn env_key(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }
        self.tavily_api_key = self.tavily_api_key.or_else(|| env_key("TAVILY_API_KEY"));
        self.serper_api_key = self.serper_api_key.or_else(|| env_key("SERPER_API_KEY"));
        self.jina_api_key = self.jina_api_key.or_else(|| env_key("JINA_API_KEY"));
        self
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ParleyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}
