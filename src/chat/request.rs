//! Inbound chat request: JSON body plus preference cookies.

use crate::llm::{Conversation, Message};
use crate::models::{split_identifier, ModelDescriptor};
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use tracing::warn;

pub const MODEL_COOKIE: &str = "selectedModel";
pub const SEARCH_MODE_COOKIE: &str = "search-mode";

/// `POST /api/chat` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model: Option<ModelPreference>,
    #[serde(default)]
    pub search_mode: Option<bool>,
}

/// The model a client asked for: a bare identifier or a stored descriptor.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelPreference {
    Identifier(String),
    Descriptor(ModelDescriptor),
}

impl ModelPreference {
    pub fn identifier(&self) -> String {
        match self {
            ModelPreference::Identifier(id) => id.clone(),
            ModelPreference::Descriptor(d) => d.identifier(),
        }
    }

    pub fn provider_id(&self) -> String {
        match self {
            ModelPreference::Identifier(id) => split_identifier(id)
                .map(|(provider, _)| provider.to_string())
                .unwrap_or_default(),
            ModelPreference::Descriptor(d) => d.provider_id.clone(),
        }
    }

    /// A stored preference can be switched off by the client.
    pub fn enabled(&self) -> bool {
        match self {
            ModelPreference::Identifier(_) => true,
            ModelPreference::Descriptor(d) => d.enabled,
        }
    }
}

/// Everything the handler needs from one request.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub chat_id: String,
    pub conversation: Conversation,
    /// `None` means the default model.
    pub preference: Option<ModelPreference>,
    pub search_mode: bool,
}

impl ChatInput {
    /// Merge body and cookies. Body fields win.
    pub fn from_parts(headers: &HeaderMap, body: ChatRequest) -> Self {
        let cookies = Cookies::from_headers(headers);

        let preference = body.model.or_else(|| {
            let raw = cookies.get(MODEL_COOKIE)?;
            match serde_json::from_str::<ModelDescriptor>(&raw) {
                Ok(descriptor) => Some(ModelPreference::Descriptor(descriptor)),
                Err(e) => {
                    warn!(error = %e, "Ignoring unparseable selectedModel cookie");
                    None
                }
            }
        });

        let search_mode = body
            .search_mode
            .unwrap_or_else(|| cookies.get(SEARCH_MODE_COOKIE).as_deref() == Some("true"));

        Self {
            chat_id: body
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            conversation: Conversation::new(body.messages),
            preference,
            search_mode,
        }
    }
}

/// Decoded `Cookie` header pairs.
#[derive(Debug, Default)]
pub struct Cookies {
    pairs: Vec<(String, String)>,
}

impl Cookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let pairs = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| (name.trim().to_string(), percent_decode(value.trim())))
            .collect();
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

/// Decode an `encodeURIComponent` value. Such values never hold a raw `&`
/// or `=`, so the whole value parses as a single form key.
fn percent_decode(value: &str) -> String {
    url::form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
