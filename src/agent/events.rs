//! Events streamed to the client while a chat runs.

use serde::Serialize;
use serde_json::Value;

/// One item of the response stream, serialized as `{"type": …, …}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A chunk of the visible answer.
    Text { text: String },
    /// Thinking text separated from the answer.
    Reasoning { text: String },
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },
    ToolResult {
        id: String,
        name: String,
        result: Value,
    },
    Finish {
        steps: usize,
        budget_exhausted: bool,
    },
    Error { message: String },
}

impl ChatEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Text { .. } => "text",
            ChatEvent::Reasoning { .. } => "reasoning",
            ChatEvent::ToolCall { .. } => "tool_call",
            ChatEvent::ToolResult { .. } => "tool_result",
            ChatEvent::Finish { .. } => "finish",
            ChatEvent::Error { .. } => "error",
        }
    }
}
