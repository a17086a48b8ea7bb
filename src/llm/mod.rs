//! Generation capability abstraction.
//!
//! Every provider is reached through the [`LanguageModel`] trait. The
//! OpenAI-compatible backend covers all supported providers; reasoning
//! models are wrapped in [`ReasoningModel`], which moves the thinking
//! segment out of the visible text.

mod openai;
mod reasoning;
mod types;

pub use openai::OpenAiChatModel;
pub use reasoning::{split_reasoning, ReasoningModel, TagSplitter};
pub use types::{
    Attachment, Conversation, FinishReason, GenerationRequest, Message, Role, StreamPart,
    ToolInvocation, ToolSpec,
};

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of parts produced by one generation call.
pub type GenerationStream = BoxStream<'static, Result<StreamPart>>;

/// A callable text-generation capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier in `provider:model-name` form.
    fn model_id(&self) -> &str;

    /// Start a streamed generation.
    async fn stream(&self, request: GenerationRequest) -> Result<GenerationStream>;
}
