//! Tool-calling orchestration.
//!
//! The runner takes a conversation and a resolved model and either lets the
//! provider return structured tool calls, or asks the model for
//! `<tool_call>` blocks and parses them itself. Both paths share the tool
//! set, the step budget and the event stream.

mod events;
mod parser;
mod runner;

pub use events::ChatEvent;
pub use parser::{parse_tool_call, ParsedToolCall, FALLBACK_SEARCH_QUERY};
pub use runner::{word_chunks, ChatRunner, RunSummary, GENERIC_ERROR_MESSAGE};
