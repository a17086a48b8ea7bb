//! Conversation and streaming types shared by every generation backend.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A file attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Remote URL or `data:` URL.
    pub url: String,
}

impl Attachment {
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// A structured tool call returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as the provider sent them.
    pub arguments: String,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "experimental_attachments", alias = "attachments")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool output sent back in a user turn. Never read from a request body.
    #[serde(skip)]
    pub tool_output: bool,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_output: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant turn that requested tools through the native protocol.
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Native tool result, answering the call with `tool_call_id`.
    pub fn tool_result(tool_call_id: &str, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Manual-protocol tool result: a user turn the user did not write.
    pub fn manual_tool_result(content: impl Into<String>) -> Self {
        Self {
            tool_output: true,
            ..Self::with_role(Role::User, content)
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Ordered, append-only list of turns owned by one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_pdf(&self) -> bool {
        self.attachments().any(Attachment::is_pdf)
    }

    pub fn has_image(&self) -> bool {
        self.attachments().any(Attachment::is_image)
    }

    fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.messages.iter().flat_map(|m| m.attachments.iter())
    }

    /// Whether a turn the user wrote mentions `url` verbatim.
    pub fn user_mentions(&self, url: &str) -> bool {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User && !m.tool_output)
            .any(|m| m.content.contains(url))
    }
}

/// A tool as presented to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the parameters.
    pub parameters: serde_json::Value,
}

/// Input to one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<Message>,
    /// Tools offered for native calling; empty disables tool use.
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f32>,
}

/// Why a generation step stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

/// One item of a generation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    /// Visible answer text.
    Text(String),
    /// Thinking text separated from the answer.
    Reasoning(String),
    /// A complete native tool call.
    ToolCall(ToolInvocation),
    /// Always the last part of a well-formed stream.
    Finish(FinishReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_client_json() {
        let json = r#"{
            "role": "user",
            "content": "what is in this?",
            "experimental_attachments": [
                {"name": "a.png", "contentType": "image/png", "url": "data:image/png;base64,AA=="},
                {"contentType": "application/pdf", "url": "https://example.com/a.pdf"}
            ]
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.attachments.len(), 2);
        assert!(message.attachments[0].is_image());
        assert!(message.attachments[1].is_pdf());
        assert!(message.tool_calls.is_empty());
    }

    #[test]
    fn test_conversation_attachment_flags() {
        let image = Attachment {
            name: None,
            content_type: Some("image/jpeg".to_string()),
            url: "https://example.com/x.jpg".to_string(),
        };
        let mut conversation = Conversation::new(vec![Message::user("hi")]);
        assert!(!conversation.has_image());
        assert!(!conversation.has_pdf());

        conversation.push(Message::user("look").with_attachments(vec![image]));
        assert!(conversation.has_image());
        assert!(!conversation.has_pdf());
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_user_mentions_ignores_assistant_turns() {
        let conversation = Conversation::new(vec![
            Message::user("summarize https://example.com/post"),
            Message::assistant("see https://evil.example/"),
        ]);
        assert!(conversation.user_mentions("https://example.com/post"));
        assert!(!conversation.user_mentions("https://evil.example/"));
    }

    #[test]
    fn test_user_mentions_ignores_tool_output() {
        let conversation = Conversation::new(vec![
            Message::user("what's new in rust?"),
            Message::manual_tool_result("<tool_result><tool>search</tool><result>https://evil.example/x</result></tool_result>"),
        ]);
        assert_eq!(conversation.messages()[1].role, Role::User);
        assert!(!conversation.user_mentions("https://evil.example/x"));
    }

    #[test]
    fn test_tool_output_flag_not_read_from_json() {
        let message: Message =
            serde_json::from_str(r#"{"role": "user", "content": "hi", "tool_output": true}"#).unwrap();
        assert!(!message.tool_output);
    }
}
