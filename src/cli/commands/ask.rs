//! Ask command implementation.

use crate::agent::ChatEvent;
use crate::chat::{ChatRequest, ModelPreference};
use crate::cli::Output;
use crate::config::Settings;
use crate::llm::Message;
use crate::service::ChatService;
use anyhow::Result;
use axum::http::HeaderMap;
use std::io::Write;

/// Run the ask command.
pub async fn run_ask(
    prompt: &str,
    model: Option<String>,
    search: bool,
    show_reasoning: bool,
    settings: Settings,
) -> Result<()> {
    let service = ChatService::from_settings(&settings)?;

    let request = ChatRequest {
        id: None,
        messages: vec![Message::user(prompt)],
        model: model.map(ModelPreference::Identifier),
        search_mode: Some(search),
    };

    let prepared = match service.prepare(&HeaderMap::new(), request) {
        Ok(prepared) => prepared,
        Err(rejection) => {
            Output::error(&rejection.message());
            Output::info("Run 'parley doctor' to see which providers are configured.");
            return Err(rejection.into());
        }
    };
    Output::info(&format!(
        "Using {} ({} tool calls)",
        prepared.model.descriptor.identifier(),
        prepared.model.tool_call_mode
    ));

    let spinner = Output::spinner("Thinking...");
    let mut spinning = true;
    let mut events = service.start(prepared);
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        if spinning && !matches!(event, ChatEvent::ToolResult { .. }) {
            spinner.finish_and_clear();
            spinning = false;
        }

        match event {
            ChatEvent::Text { text } => {
                print!("{}", text);
                stdout.flush()?;
            }
            ChatEvent::Reasoning { text } => {
                if show_reasoning {
                    Output::reasoning(&text);
                }
            }
            ChatEvent::ToolCall { name, arguments, .. } => {
                Output::tool_call(&name, &arguments.to_string());
            }
            ChatEvent::ToolResult { .. } => {}
            ChatEvent::Finish { steps, budget_exhausted } => {
                println!();
                if budget_exhausted {
                    Output::warning(&format!("Stopped after {} steps (step budget reached).", steps));
                }
            }
            ChatEvent::Error { message } => {
                println!();
                Output::error(&message);
                anyhow::bail!(message);
            }
        }
    }

    Ok(())
}
