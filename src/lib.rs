//! Parley - a research chat backend for hosted LLMs
//!
//! Parley routes a conversation to one of several model providers, lets the
//! model call web search, page retrieval and video search tools, and streams
//! the answer back as events.
//!
//! # Overview
//!
//! Two tool-calling protocols are supported:
//! - Native: the provider returns structured tool calls
//! - Manual: the model writes `<tool_call>` blocks that Parley parses,
//!   validates and executes
//!
//! # Architecture
//!
//! - `config` - Settings file and prompt templates
//! - `models` - Model catalog, provider configuration, capability registry
//! - `llm` - Generation abstraction, OpenAI-compatible backend, reasoning decorator
//! - `tools` - Tool schemas and the search/retrieve/videoSearch tools
//! - `agent` - Tool-call parser and the native/manual chat runner
//! - `chat` - Request intake: cookies, preference, validation
//! - `service` - Shared state and per-request task spawning
//!
//! # Example
//!
//! ```rust,no_run
//! use parley::agent::ChatEvent;
//! use parley::chat::{ChatRequest, ModelPreference};
//! use parley::config::Settings;
//! use parley::llm::Message;
//! use parley::service::ChatService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = ChatService::from_settings(&Settings::load()?)?;
//!
//!     let request = ChatRequest {
//!         id: None,
//!         messages: vec![Message::user("What changed in the latest Rust release?")],
//!         model: Some(ModelPreference::Identifier("openai:gpt-4o-mini".to_string())),
//!         search_mode: Some(true),
//!     };
//!     let prepared = service.prepare(&Default::default(), request)?;
//!
//!     let mut events = service.start(prepared);
//!     while let Some(event) = events.recv().await {
//!         if let ChatEvent::Text { text } = event {
//!             print!("{}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod openai;
pub mod service;
pub mod tools;

pub use error::{ParleyError, Result};
