//! Chat service: everything a request needs, built once from settings.

use crate::agent::{ChatEvent, ChatRunner};
use crate::chat::{self, ChatRejection, ChatRequest, PreparedChat};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::models::{ModelRegistry, ProviderConfig};
use crate::tools::ToolSet;
use axum::http::HeaderMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, Instrument};

/// Capacity of the per-request event channel.
const EVENT_BUFFER: usize = 64;

/// Shared, read-only state for all requests.
pub struct ChatService {
    registry: ModelRegistry,
    runner: Arc<ChatRunner>,
}

impl ChatService {
    pub fn new(registry: ModelRegistry, runner: ChatRunner) -> Self {
        Self {
            registry,
            runner: Arc::new(runner),
        }
    }

    /// Build from settings, reading provider and tool credentials from the
    /// environment.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let providers = ProviderConfig::from_env();
        let registry = ModelRegistry::from_settings(settings, providers);
        let tools = ToolSet::from_settings(&settings.tools.clone().with_env_fallback())?;

        info!(
            models = registry.catalog().entries().len(),
            tools = tools.declarations().count(),
            "Chat service ready"
        );

        Ok(Self::new(
            registry,
            ChatRunner::new(tools, prompts, settings.chat.clone()),
        ))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn prepare(&self, headers: &HeaderMap, body: ChatRequest) -> std::result::Result<PreparedChat, ChatRejection> {
        chat::prepare(&self.registry, headers, body)
    }

    /// Run a prepared chat on its own task and return its event stream.
    ///
    /// The stream always ends with a `finish` or `error` event.
    pub fn start(&self, prepared: PreparedChat) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let runner = Arc::clone(&self.runner);
        let span = tracing::info_span!("chat", chat_id = %prepared.input.chat_id);

        tokio::spawn(
            async move {
                let PreparedChat { input, model } = prepared;
                // Failures were already reported on the stream.
                let _ = runner
                    .run(&model, input.conversation, input.search_mode, &tx)
                    .await;
            }
            .instrument(span),
        );

        rx
    }
}
