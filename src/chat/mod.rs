//! Request intake for `/api/chat`: parse, check, pick the model.

mod request;
mod validation;

pub use request::{ChatInput, ChatRequest, Cookies, ModelPreference, MODEL_COOKIE, SEARCH_MODE_COOKIE};
pub use validation::{check_attachments, check_referer, select_model, ChatRejection};

use crate::models::{ModelRegistry, ResolvedModel};
use axum::http::HeaderMap;
use tracing::error;

/// A request that passed every check and has a model to run on.
#[derive(Debug)]
pub struct PreparedChat {
    pub input: ChatInput,
    pub model: ResolvedModel,
}

/// Run the intake checks in order: referer, provider, attachments.
pub fn prepare(
    registry: &ModelRegistry,
    headers: &HeaderMap,
    body: ChatRequest,
) -> Result<PreparedChat, ChatRejection> {
    check_referer(headers)?;
    let input = ChatInput::from_parts(headers, body);
    let descriptor = select_model(registry, input.preference.as_ref())?;
    check_attachments(&descriptor, &input.conversation)?;

    let model = registry.resolve(&descriptor).map_err(|e| {
        error!(error = %e, model = %descriptor.identifier(), "Could not build model client");
        ChatRejection::Internal
    })?;
    Ok(PreparedChat { input, model })
}
