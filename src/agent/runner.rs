//! Chat runner: drives one request through the native or manual tool path.

use super::events::ChatEvent;
use super::parser::parse_tool_call;
use crate::config::{ChatSettings, Prompts};
use crate::error::{ParleyError, Result};
use crate::llm::{
    Conversation, FinishReason, GenerationRequest, Message, StreamPart, ToolInvocation,
};
use crate::models::{ResolvedModel, ToolCallMode};
use crate::tools::{ToolContext, ToolSet};
use futures::StreamExt;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Client-facing text for failures that are not worth detailing.
pub const GENERIC_ERROR_MESSAGE: &str = "Error processing your request";

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+\s*|\s+").expect("valid regex"));

/// Split text into word-sized chunks that concatenate back to the input.
pub fn word_chunks(text: &str) -> impl Iterator<Item = &str> {
    WORD_RE.find_iter(text).map(|m| m.as_str())
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Model invocations made.
    pub steps: usize,
    /// The run stopped because the step budget ran out, not because the
    /// model finished.
    pub budget_exhausted: bool,
}

/// Text and tool calls collected from one model invocation.
struct StepOutput {
    text: String,
    tool_calls: Vec<ToolInvocation>,
    finish: Option<FinishReason>,
}

/// Shared, read-only orchestration state.
pub struct ChatRunner {
    tools: ToolSet,
    prompts: Prompts,
    settings: ChatSettings,
}

impl ChatRunner {
    pub fn new(tools: ToolSet, prompts: Prompts, settings: ChatSettings) -> Self {
        Self {
            tools,
            prompts,
            settings,
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Run one request under the wall-clock deadline.
    ///
    /// Ends the event stream with `finish` on success or `error` on failure;
    /// the error is returned as well.
    #[instrument(skip_all, fields(model = %model.descriptor.identifier(), mode = %model.tool_call_mode, search_mode = search_mode))]
    pub async fn run(
        &self,
        model: &ResolvedModel,
        conversation: Conversation,
        search_mode: bool,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<RunSummary> {
        let deadline = self.settings.request_timeout_seconds;
        let outcome = tokio::time::timeout(
            Duration::from_secs(deadline),
            self.dispatch(model, conversation, search_mode, events),
        )
        .await
        .unwrap_or(Err(ParleyError::Timeout(deadline)));

        match outcome {
            Ok(summary) => {
                info!(steps = summary.steps, budget_exhausted = summary.budget_exhausted, "Chat completed");
                // The client may already be gone; nothing left to do then.
                let _ = events
                    .send(ChatEvent::Finish {
                        steps: summary.steps,
                        budget_exhausted: summary.budget_exhausted,
                    })
                    .await;
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Chat failed");
                let message = match &e {
                    ParleyError::Timeout(_) => e.to_string(),
                    _ => GENERIC_ERROR_MESSAGE.to_string(),
                };
                let _ = events.send(ChatEvent::Error { message }).await;
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        model: &ResolvedModel,
        conversation: Conversation,
        search_mode: bool,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<RunSummary> {
        let budget = self.settings.step_budget(search_mode);
        let system = self.prompts.researcher_system(chrono::Local::now());
        debug!(budget, "Dispatching");

        match model.tool_call_mode {
            ToolCallMode::Native => {
                self.run_native(model, conversation, system, search_mode, budget, events)
                    .await
            }
            ToolCallMode::Manual => {
                self.run_manual(model, conversation, system, search_mode, budget, events)
                    .await
            }
        }
    }

    /// Structured tool calls, executed here between model steps.
    async fn run_native(
        &self,
        model: &ResolvedModel,
        mut conversation: Conversation,
        system: String,
        search_mode: bool,
        budget: usize,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<RunSummary> {
        let tools = if search_mode { self.tools.specs() } else { Vec::new() };

        for step in 1..=budget {
            let request = GenerationRequest {
                system: system.clone(),
                messages: conversation.messages().to_vec(),
                tools: tools.clone(),
                temperature: self.settings.temperature,
            };
            let output = self.invoke(model, request, events, true).await?;
            debug!(step, finish = ?output.finish, tool_calls = output.tool_calls.len(), "Native step finished");

            if output.tool_calls.is_empty() {
                return Ok(RunSummary { steps: step, budget_exhausted: false });
            }
            if step == budget {
                warn!(budget, "Step budget exhausted with pending tool calls");
                return Ok(RunSummary { steps: step, budget_exhausted: true });
            }

            for call in &output.tool_calls {
                emit(events, ChatEvent::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: serde_json::from_str(&call.arguments)
                        .unwrap_or_else(|_| Value::String(call.arguments.clone())),
                })
                .await?;
            }
            conversation.push(Message::assistant_tool_calls(
                output.text,
                output.tool_calls.clone(),
            ));

            for call in output.tool_calls {
                info!(tool = %call.name, arguments = %call.arguments, "Calling tool");
                let result = self
                    .tools
                    .execute_json(&call.name, &call.arguments, ToolContext { conversation: &conversation })
                    .await;
                emit(events, ChatEvent::ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    result: result.clone(),
                })
                .await?;
                conversation.push(Message::tool_result(&call.id, result.to_string()));
            }
        }

        Ok(RunSummary { steps: budget, budget_exhausted: true })
    }

    /// XML tool calls parsed out of the model's text.
    async fn run_manual(
        &self,
        model: &ResolvedModel,
        mut conversation: Conversation,
        system: String,
        search_mode: bool,
        budget: usize,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<RunSummary> {
        let system = if search_mode {
            format!(
                "{}\n\n{}",
                system,
                self.prompts.manual_tool_instructions(&self.tools.describe())
            )
        } else {
            system
        };

        let mut step = 0;
        loop {
            step += 1;
            let request = GenerationRequest {
                system: system.clone(),
                messages: conversation.messages().to_vec(),
                tools: Vec::new(),
                temperature: self.settings.temperature,
            };
            let output = self.invoke(model, request, events, false).await?;

            if !search_mode {
                emit_words(events, &output.text).await?;
                return Ok(RunSummary { steps: step, budget_exhausted: false });
            }

            let call = parse_tool_call(&output.text, &self.tools);
            if call.is_noop() {
                emit_words(events, &output.text).await?;
                return Ok(RunSummary { steps: step, budget_exhausted: false });
            }
            if step >= budget {
                warn!(budget, tool = %call.tool, "Step budget exhausted, answering with last text");
                emit_words(events, &output.text).await?;
                return Ok(RunSummary { steps: step, budget_exhausted: true });
            }

            let id = format!("call_{}", uuid::Uuid::new_v4().simple());
            let arguments = call
                .parameters
                .clone()
                .map(Value::Object)
                .unwrap_or(Value::Null);
            info!(step, tool = %call.tool, %arguments, "Calling tool");
            emit(events, ChatEvent::ToolCall {
                id: id.clone(),
                name: call.tool.clone(),
                arguments,
            })
            .await?;

            let result = self
                .tools
                .execute(&call.tool, call.parameters.as_ref(), ToolContext { conversation: &conversation })
                .await;
            emit(events, ChatEvent::ToolResult {
                id,
                name: call.tool.clone(),
                result: result.clone(),
            })
            .await?;

            conversation.push(Message::assistant(output.text));
            conversation.push(Message::manual_tool_result(format!(
                "<tool_result><tool>{}</tool><result>{}</result></tool_result>",
                call.tool, result
            )));
        }
    }

    /// Call the model once. Reasoning is forwarded as it arrives; text is
    /// forwarded only when `stream_text` is set.
    async fn invoke(
        &self,
        model: &ResolvedModel,
        request: GenerationRequest,
        events: &mpsc::Sender<ChatEvent>,
        stream_text: bool,
    ) -> Result<StepOutput> {
        let mut stream = model.model.stream(request).await?;
        let mut output = StepOutput {
            text: String::new(),
            tool_calls: Vec::new(),
            finish: None,
        };

        while let Some(part) = stream.next().await {
            match part? {
                StreamPart::Text(text) => {
                    if stream_text {
                        emit(events, ChatEvent::Text { text: text.clone() }).await?;
                    }
                    output.text.push_str(&text);
                }
                StreamPart::Reasoning(text) => {
                    emit(events, ChatEvent::Reasoning { text }).await?;
                }
                StreamPart::ToolCall(call) => output.tool_calls.push(call),
                StreamPart::Finish(reason) => output.finish = Some(reason),
            }
        }

        Ok(output)
    }
}

async fn emit(events: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> Result<()> {
    events
        .send(event)
        .await
        .map_err(|_| ParleyError::Generation("client disconnected".to_string()))
}

async fn emit_words(events: &mpsc::Sender<ChatEvent>, text: &str) -> Result<()> {
    for chunk in word_chunks(text) {
        emit(events, ChatEvent::Text { text: chunk.to_string() }).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationStream, LanguageModel};
    use crate::models::ModelDescriptor;
    use crate::config::ToolSettings;
    use crate::tools::testing::EchoTool;
    use crate::tools::{RetrieveTool, Tool};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned step outputs; the last one repeats forever.
    struct ScriptedModel {
        steps: Mutex<VecDeque<Vec<StreamPart>>>,
        last: Vec<StreamPart>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedModel {
        fn new(steps: Vec<Vec<StreamPart>>) -> Arc<Self> {
            let last = steps.last().cloned().unwrap_or_default();
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                last,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn invocations(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn model_id(&self) -> &str {
            "test:scripted"
        }

        async fn stream(&self, request: GenerationRequest) -> Result<GenerationStream> {
            self.requests.lock().unwrap().push(request);
            let parts = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.clone());
            Ok(futures::stream::iter(parts.into_iter().map(Ok)).boxed())
        }
    }

    struct StalledModel;

    #[async_trait]
    impl LanguageModel for StalledModel {
        fn model_id(&self) -> &str {
            "test:stalled"
        }

        async fn stream(&self, _request: GenerationRequest) -> Result<GenerationStream> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(futures::stream::empty().boxed())
        }
    }

    fn text(s: &str) -> Vec<StreamPart> {
        vec![StreamPart::Text(s.to_string()), StreamPart::Finish(FinishReason::Stop)]
    }

    fn resolved(model: Arc<dyn LanguageModel>, mode: ToolCallMode) -> ResolvedModel {
        ResolvedModel {
            descriptor: ModelDescriptor::new("test", "scripted", "Scripted", "Test", mode),
            model,
            tool_call_mode: mode,
            reasoning: false,
            multimodal: false,
        }
    }

    fn runner(echo: Arc<EchoTool>, settings: ChatSettings) -> ChatRunner {
        ChatRunner::new(ToolSet::new(vec![echo as Arc<dyn Tool>]), Prompts::default(), settings)
    }

    async fn run(
        runner: &ChatRunner,
        model: &ResolvedModel,
        search_mode: bool,
    ) -> (Result<RunSummary>, Vec<ChatEvent>) {
        let (tx, mut rx) = mpsc::channel(1024);
        let conversation = Conversation::new(vec![Message::user("what's new in rust?")]);
        let result = runner.run(model, conversation, search_mode, &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    fn answer_text(events: &[ChatEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    const CALL: &str = "<tool_call><tool>search</tool><parameters><query>rust 1.80</query></parameters></tool_call>";

    #[test]
    fn test_word_chunks_roundtrip() {
        let text = "  Hello, brave\nnew   world ";
        let chunks: Vec<_> = word_chunks(text).collect();
        assert_eq!(chunks, vec!["  ", "Hello, ", "brave\n", "new   ", "world "]);
        assert_eq!(chunks.concat(), text);
    }

    #[tokio::test]
    async fn test_manual_direct_answer_uses_one_invocation() {
        let echo = Arc::new(EchoTool::new("search"));
        let runner = runner(echo.clone(), ChatSettings::default());
        let model = ScriptedModel::new(vec![text("Rust 1.80 added LazyLock.")]);

        let (result, events) = run(&runner, &resolved(model.clone(), ToolCallMode::Manual), true).await;
        let summary = result.unwrap();

        assert_eq!(model.invocations(), 1);
        assert_eq!(summary, RunSummary { steps: 1, budget_exhausted: false });
        assert_eq!(answer_text(&events), "Rust 1.80 added LazyLock.");
        assert!(echo.calls.lock().unwrap().is_empty());
        assert_eq!(events.last(), Some(&ChatEvent::Finish { steps: 1, budget_exhausted: false }));
    }

    #[tokio::test]
    async fn test_manual_tool_loop_stops_at_budget() {
        let echo = Arc::new(EchoTool::new("search"));
        let settings = ChatSettings { search_step_budget: 3, ..ChatSettings::default() };
        let runner = runner(echo.clone(), settings);
        let model = ScriptedModel::new(vec![text(CALL)]);

        let (result, events) = run(&runner, &resolved(model.clone(), ToolCallMode::Manual), true).await;
        let summary = result.unwrap();

        assert_eq!(model.invocations(), 3);
        assert_eq!(summary, RunSummary { steps: 3, budget_exhausted: true });
        assert_eq!(echo.calls.lock().unwrap().len(), 2);
        assert_eq!(answer_text(&events), CALL);
    }

    #[tokio::test]
    async fn test_manual_tool_result_is_fed_back() {
        let echo = Arc::new(EchoTool::new("search"));
        let runner = runner(echo.clone(), ChatSettings::default());
        let model = ScriptedModel::new(vec![text(CALL), text("Answer with sources.")]);

        let (result, events) = run(&runner, &resolved(model.clone(), ToolCallMode::Manual), true).await;
        assert_eq!(result.unwrap().steps, 2);

        let requests = model.requests.lock().unwrap();
        assert!(requests[0].system.contains("<tool_call>"));
        assert!(requests[0].tools.is_empty());
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].content, CALL);
        assert!(second[2].content.starts_with("<tool_result><tool>search</tool>"));
        assert!(second[2].content.contains("rust 1.80"));

        assert_eq!(echo.calls.lock().unwrap()[0]["query"], json!("rust 1.80"));
        assert!(events.iter().any(|e| matches!(e, ChatEvent::ToolCall { name, .. } if name == "search")));
        assert!(events.iter().any(|e| matches!(e, ChatEvent::ToolResult { result, .. } if result["echo"] == json!("rust 1.80"))));
        assert_eq!(answer_text(&events), "Answer with sources.");
    }

    #[tokio::test]
    async fn test_manual_without_search_mode_never_calls_tools() {
        let echo = Arc::new(EchoTool::new("search"));
        let settings = ChatSettings { default_step_budget: 4, ..ChatSettings::default() };
        let runner = runner(echo.clone(), settings);
        let model = ScriptedModel::new(vec![text(CALL)]);

        let (result, _) = run(&runner, &resolved(model.clone(), ToolCallMode::Manual), false).await;
        assert_eq!(result.unwrap().steps, 1);
        assert!(echo.calls.lock().unwrap().is_empty());
        assert!(!model.requests.lock().unwrap()[0].system.contains("<tool_call>"));
    }

    #[tokio::test]
    async fn test_native_round_trip() {
        let echo = Arc::new(EchoTool::new("search"));
        let runner = runner(echo.clone(), ChatSettings::default());
        let call = ToolInvocation {
            id: "call_a".to_string(),
            name: "search".to_string(),
            arguments: r#"{"query":"tokio"}"#.to_string(),
        };
        let model = ScriptedModel::new(vec![
            vec![
                StreamPart::Text("Searching. ".to_string()),
                StreamPart::ToolCall(call),
                StreamPart::Finish(FinishReason::ToolCalls),
            ],
            text("Tokio is an async runtime."),
        ]);

        let (result, events) = run(&runner, &resolved(model.clone(), ToolCallMode::Native), true).await;
        assert_eq!(result.unwrap(), RunSummary { steps: 2, budget_exhausted: false });
        assert_eq!(answer_text(&events), "Searching. Tokio is an async runtime.");

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].tools.len(), 1);
        let second = &requests[1].messages;
        assert_eq!(second[1].tool_calls.len(), 1);
        assert_eq!(second[2].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(echo.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_refuses_urls_from_tool_results() {
        let echo = Arc::new(EchoTool::new("search"));
        let retrieve = RetrieveTool::new(reqwest::Client::new(), &ToolSettings::default()).unwrap();
        let tools = ToolSet::new(vec![echo.clone() as Arc<dyn Tool>, Arc::new(retrieve) as Arc<dyn Tool>]);
        let runner = ChatRunner::new(tools, Prompts::default(), ChatSettings::default());
        let model = ScriptedModel::new(vec![
            text("<tool_call><tool>search</tool><parameters><query>https://evil.example/x</query></parameters></tool_call>"),
            text("<tool_call><tool>retrieve</tool><parameters><url>https://evil.example/x</url></parameters></tool_call>"),
            text("Nothing to fetch."),
        ]);

        let (result, events) = run(&runner, &resolved(model.clone(), ToolCallMode::Manual), true).await;
        assert_eq!(result.unwrap().steps, 3);
        assert_eq!(echo.calls.lock().unwrap().len(), 1);

        let retrieve_result = events
            .iter()
            .find_map(|e| match e {
                ChatEvent::ToolResult { name, result, .. } if name == "retrieve" => Some(result.clone()),
                _ => None,
            })
            .unwrap();
        assert!(retrieve_result["error"]
            .as_str()
            .unwrap()
            .contains("retrieve only accepts URLs from the user's messages"));
    }

    #[tokio::test]
    async fn test_native_tool_loop_stops_at_budget() {
        let echo = Arc::new(EchoTool::new("search"));
        let settings = ChatSettings { search_step_budget: 3, ..ChatSettings::default() };
        let runner = runner(echo.clone(), settings);
        let model = ScriptedModel::new(vec![vec![
            StreamPart::ToolCall(ToolInvocation {
                id: "call_loop".to_string(),
                name: "search".to_string(),
                arguments: r#"{"query":"again"}"#.to_string(),
            }),
            StreamPart::Finish(FinishReason::ToolCalls),
        ]]);

        let (result, events) = run(&runner, &resolved(model.clone(), ToolCallMode::Native), true).await;
        assert_eq!(result.unwrap(), RunSummary { steps: 3, budget_exhausted: true });
        assert_eq!(model.invocations(), 3);
        assert_eq!(echo.calls.lock().unwrap().len(), 2);

        let tool_calls = events.iter().filter(|e| matches!(e, ChatEvent::ToolCall { .. })).count();
        assert_eq!(tool_calls, 2);
        assert_eq!(events.last(), Some(&ChatEvent::Finish { steps: 3, budget_exhausted: true }));
    }

    #[tokio::test]
    async fn test_native_without_search_mode_offers_no_tools() {
        let echo = Arc::new(EchoTool::new("search"));
        let runner = runner(echo, ChatSettings::default());
        let model = ScriptedModel::new(vec![text("Hi.")]);

        let (result, _) = run(&runner, &resolved(model.clone(), ToolCallMode::Native), false).await;
        assert_eq!(result.unwrap().steps, 1);
        assert!(model.requests.lock().unwrap()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_reasoning_is_forwarded_separately() {
        let echo = Arc::new(EchoTool::new("search"));
        let runner = runner(echo, ChatSettings::default());
        let model = ScriptedModel::new(vec![vec![
            StreamPart::Reasoning("thinking".to_string()),
            StreamPart::Text("done".to_string()),
            StreamPart::Finish(FinishReason::Stop),
        ]]);

        let (_, events) = run(&runner, &resolved(model, ToolCallMode::Manual), true).await;
        assert_eq!(events[0], ChatEvent::Reasoning { text: "thinking".to_string() });
        assert_eq!(answer_text(&events), "done");
    }

    #[tokio::test]
    async fn test_deadline_is_reported() {
        let echo = Arc::new(EchoTool::new("search"));
        let settings = ChatSettings { request_timeout_seconds: 1, ..ChatSettings::default() };
        let runner = runner(echo, settings);

        let (result, events) = run(&runner, &resolved(Arc::new(StalledModel), ToolCallMode::Native), true).await;
        assert!(matches!(result, Err(ParleyError::Timeout(1))));
        match events.last() {
            Some(ChatEvent::Error { message }) => assert!(message.contains("deadline")),
            other => panic!("expected error event, got {:?}", other),
        }
    }
}
