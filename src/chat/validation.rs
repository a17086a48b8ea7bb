//! Request checks that end in a specific HTTP status.

use super::request::ModelPreference;
use crate::agent::GENERIC_ERROR_MESSAGE;
use crate::llm::Conversation;
use crate::models::{ModelDescriptor, ModelRegistry, DEFAULT_MODEL_ID};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// A request refused before generation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRejection {
    /// Chats cannot be continued from a shared page.
    SharePage,
    ProviderDisabled(String),
    UnsupportedAttachments { pdf: bool, image: bool },
    MalformedBody(String),
    Internal,
}

impl ChatRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatRejection::SharePage => StatusCode::FORBIDDEN,
            ChatRejection::ProviderDisabled(_) => StatusCode::NOT_FOUND,
            ChatRejection::UnsupportedAttachments { .. } | ChatRejection::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ChatRejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ChatRejection::SharePage => "Chat API is not available on share pages".to_string(),
            ChatRejection::ProviderDisabled(provider) => {
                format!("Selected provider is not enabled {}", provider)
            }
            ChatRejection::UnsupportedAttachments { pdf: true, image: true } => {
                "The selected model does not support both PDF and Image inputs.  Please select a different model.".to_string()
            }
            ChatRejection::UnsupportedAttachments { pdf: true, .. } => {
                "The selected model does not support PDF inputs. Please select a different model.".to_string()
            }
            ChatRejection::UnsupportedAttachments { .. } => {
                "The selected model does not support Image inputs. Please select a different model.".to_string()
            }
            ChatRejection::MalformedBody(detail) => format!("Invalid request body: {}", detail),
            ChatRejection::Internal => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl std::fmt::Display for ChatRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ChatRejection {}

impl IntoResponse for ChatRejection {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

/// Refuse requests coming from a shared-chat page.
pub fn check_referer(headers: &HeaderMap) -> Result<(), ChatRejection> {
    let from_share_page = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|referer| referer.contains("/share/"));
    if from_share_page {
        Err(ChatRejection::SharePage)
    } else {
        Ok(())
    }
}

/// Pick the descriptor for a request's preference.
///
/// A preference naming an unconfigured provider, or switched off by the
/// client, is refused. Anything else falls back to the default model, which
/// is refused in turn when its own provider is not configured.
pub fn select_model(
    registry: &ModelRegistry,
    preference: Option<&ModelPreference>,
) -> Result<ModelDescriptor, ChatRejection> {
    let identifier = preference
        .map(ModelPreference::identifier)
        .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
    let provider_id = match preference {
        Some(p) => p.provider_id(),
        None => registry.catalog().default_model().provider_id.clone(),
    };

    let switched_off = preference.is_some_and(|p| !p.enabled());
    if !registry.providers().is_enabled(&provider_id) || switched_off {
        warn!(model = %identifier, provider = %provider_id, "Selected provider is not enabled");
        return Err(ChatRejection::ProviderDisabled(provider_id));
    }

    let descriptor = registry.descriptor_for(&identifier);
    if !registry.providers().is_enabled(&descriptor.provider_id) {
        warn!(model = %descriptor.identifier(), "Fallback model's provider is not enabled");
        return Err(ChatRejection::ProviderDisabled(descriptor.provider_id));
    }
    Ok(descriptor)
}

/// Refuse image or PDF attachments for models that cannot read them.
pub fn check_attachments(
    descriptor: &ModelDescriptor,
    conversation: &Conversation,
) -> Result<(), ChatRejection> {
    let pdf = conversation.has_pdf();
    let image = conversation.has_image();
    if (pdf || image) && !descriptor.is_multimodal() {
        warn!(model = %descriptor.identifier(), pdf, image, "Attachments not supported by model");
        return Err(ChatRejection::UnsupportedAttachments { pdf, image });
    }
    Ok(())
}
