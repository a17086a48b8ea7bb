//! OpenAI-compatible chat-completions backend.
//!
//! Every supported provider exposes this surface, so one implementation
//! serves them all; only the base URL and key differ.

use super::types::{
    FinishReason, GenerationRequest, Message, Role, StreamPart, ToolInvocation, ToolSpec,
};
use super::{GenerationStream, LanguageModel};
use crate::error::{ParleyError, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCallChunk,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        ChatCompletionResponseStream, ChatCompletionTool, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, CreateChatCompletionStreamResponse, FunctionCall,
        FunctionObject, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, instrument};

/// A model served by an OpenAI-compatible endpoint.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    identifier: String,
    model: String,
}

impl OpenAiChatModel {
    /// `identifier` is `provider:model`; `model` is the name sent on the wire.
    pub fn new(client: Client<OpenAIConfig>, identifier: &str, model: &str) -> Self {
        Self {
            client,
            identifier: identifier.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn model_id(&self) -> &str {
        &self.identifier
    }

    #[instrument(skip(self, request), fields(model = %self.identifier, messages = request.messages.len(), tools = request.tools.len()))]
    async fn stream(&self, request: GenerationRequest) -> Result<GenerationStream> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system.clone())
                    .build()?
                    .into(),
            );
        }
        for message in &request.messages {
            messages.push(convert_message(message)?);
        }

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages).stream(true);
        if !request.tools.is_empty() {
            builder.tools(request.tools.iter().map(convert_tool).collect::<Vec<_>>());
        }
        if let Some(temperature) = request.temperature {
            builder.temperature(temperature);
        }
        let chat_request = builder.build()?;

        debug!("Opening completion stream");
        let inner = self
            .client
            .chat()
            .create_stream(chat_request)
            .await
            .map_err(|e| ParleyError::Generation(format!("{}: {}", self.identifier, e)))?;

        Ok(into_parts(inner))
    }
}

/// Convert a conversation turn into the request format.
fn convert_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        Role::User => {
            let forwarded: Vec<_> = message
                .attachments
                .iter()
                .filter(|a| a.is_image() || a.is_pdf())
                .collect();

            if forwarded.is_empty() {
                ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()?
                    .into()
            } else {
                let mut parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartTextArgs::default()
                        .text(message.content.clone())
                        .build()?,
                )];
                // PDFs travel as data URLs in image parts; multimodal
                // providers in the catalog accept both.
                for attachment in forwarded {
                    parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImageArgs::default()
                            .image_url(ImageUrlArgs::default().url(attachment.url.clone()).build()?)
                            .build()?,
                    ));
                }
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(parts))
                    .build()?
                    .into()
            }
        }
        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                builder.content(message.content.clone());
            }
            if !message.tool_calls.is_empty() {
                builder.tool_calls(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            builder.build()?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()?
            .into(),
    };
    Ok(converted)
}

fn convert_tool(tool: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            parameters: Some(tool.parameters.clone()),
            strict: None,
        },
    }
}

fn convert_finish_reason(reason: async_openai::types::FinishReason) -> FinishReason {
    use async_openai::types::FinishReason as Wire;
    match reason {
        Wire::Stop => FinishReason::Stop,
        Wire::Length => FinishReason::Length,
        Wire::ToolCalls | Wire::FunctionCall => FinishReason::ToolCalls,
        Wire::ContentFilter => FinishReason::ContentFilter,
    }
}

/// Tool-call fragments collected across chunks, keyed by their stream index.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<u32, ToolInvocation>,
}

impl ToolCallAccumulator {
    fn absorb(&mut self, chunk: &ChatCompletionMessageToolCallChunk) {
        let entry = self.calls.entry(chunk.index).or_insert_with(|| ToolInvocation {
            id: String::new(),
            name: String::new(),
            arguments: String::new(),
        });
        // Some servers repeat the id and name on every chunk; only arguments
        // arrive in pieces.
        if let Some(id) = chunk.id.as_ref().filter(|id| !id.is_empty()) {
            if entry.id.is_empty() {
                entry.id = id.clone();
            }
        }
        if let Some(function) = &chunk.function {
            if let Some(name) = function.name.as_ref().filter(|name| !name.is_empty()) {
                if entry.name.is_empty() {
                    entry.name = name.clone();
                }
            }
            if let Some(arguments) = &function.arguments {
                entry.arguments.push_str(arguments);
            }
        }
    }

    fn drain(&mut self) -> impl Iterator<Item = ToolInvocation> {
        std::mem::take(&mut self.calls)
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|mut call| {
                if call.id.is_empty() {
                    call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                }
                call
            })
    }
}

struct PartState {
    inner: ChatCompletionResponseStream,
    tool_calls: ToolCallAccumulator,
    finish_reason: Option<FinishReason>,
    pending: VecDeque<StreamPart>,
    done: bool,
}

impl PartState {
    fn absorb(&mut self, chunk: CreateChatCompletionStreamResponse) {
        for choice in chunk.choices {
            if let Some(text) = choice.delta.content {
                if !text.is_empty() {
                    self.pending.push_back(StreamPart::Text(text));
                }
            }
            if let Some(calls) = &choice.delta.tool_calls {
                for call in calls {
                    self.tool_calls.absorb(call);
                }
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(convert_finish_reason(reason));
            }
        }
    }

    fn finish(&mut self) {
        let calls: Vec<_> = self.tool_calls.drain().collect();
        let reason = match self.finish_reason {
            Some(reason) => reason,
            None if !calls.is_empty() => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        };
        self.pending
            .extend(calls.into_iter().map(StreamPart::ToolCall));
        self.pending.push_back(StreamPart::Finish(reason));
        self.done = true;
    }
}

/// Map wire chunks to parts. Tool calls are emitted whole, after the text.
fn into_parts(inner: ChatCompletionResponseStream) -> GenerationStream {
    let state = PartState {
        inner,
        tool_calls: ToolCallAccumulator::default(),
        finish_reason: None,
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(part) = state.pending.pop_front() {
                return Some((Ok(part), state));
            }
            if state.done {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => state.absorb(chunk),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(ParleyError::Generation(e.to_string())), state));
                }
                None => state.finish(),
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Attachment;
    use async_openai::types::FunctionCallStream;

    fn chunk(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ChatCompletionMessageToolCallChunk {
        ChatCompletionMessageToolCallChunk {
            index,
            id: id.map(str::to_string),
            r#type: Some(ChatCompletionToolType::Function),
            function: Some(FunctionCallStream {
                name: name.map(str::to_string),
                arguments: args.map(str::to_string),
            }),
        }
    }

    #[test]
    fn test_tool_call_fragments_are_joined() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(&chunk(0, Some("call_1"), Some("search"), Some("{\"query\":")));
        acc.absorb(&chunk(1, None, Some("retrieve"), Some("{\"url\":\"https://a.b\"}")));
        acc.absorb(&chunk(0, None, None, Some("\"rust\"}")));

        let calls: Vec<_> = acc.drain().collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments, "{\"query\":\"rust\"}");
        assert_eq!(calls[1].name, "retrieve");
        assert!(calls[1].id.starts_with("call_"));
    }

    #[test]
    fn test_repeated_id_and_name_are_not_duplicated() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(&chunk(0, Some("call_1"), Some("search"), Some("{\"query\":")));
        acc.absorb(&chunk(0, Some("call_1"), Some("search"), Some("\"tokio\"}")));

        let calls: Vec<_> = acc.drain().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments, "{\"query\":\"tokio\"}");
    }

    #[test]
    fn test_convert_tool_spec() {
        let tool = convert_tool(&ToolSpec {
            name: "search".to_string(),
            description: "Search the web".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        });
        assert_eq!(tool.function.name, "search");
        assert_eq!(tool.function.description.as_deref(), Some("Search the web"));
    }

    #[test]
    fn test_convert_messages_by_role() {
        let user = convert_message(&Message::user("hello")).unwrap();
        assert!(matches!(user, ChatCompletionRequestMessage::User(_)));

        let with_image = Message::user("what is this").with_attachments(vec![Attachment {
            name: None,
            content_type: Some("image/png".to_string()),
            url: "data:image/png;base64,AA==".to_string(),
        }]);
        match convert_message(&with_image).unwrap() {
            ChatCompletionRequestMessage::User(msg) => match msg.content {
                ChatCompletionRequestUserMessageContent::Array(parts) => assert_eq!(parts.len(), 2),
                other => panic!("expected content parts, got {:?}", other),
            },
            other => panic!("expected user message, got {:?}", other),
        }

        let call = ToolInvocation {
            id: "call_9".to_string(),
            name: "search".to_string(),
            arguments: "{}".to_string(),
        };
        let assistant = convert_message(&Message::assistant_tool_calls("", vec![call])).unwrap();
        match assistant {
            ChatCompletionRequestMessage::Assistant(msg) => {
                assert_eq!(msg.tool_calls.map(|c| c.len()), Some(1));
            }
            other => panic!("expected assistant message, got {:?}", other),
        }

        let tool = convert_message(&Message::tool_result("call_9", "{}")).unwrap();
        assert!(matches!(tool, ChatCompletionRequestMessage::Tool(_)));
    }
}
