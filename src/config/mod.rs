//! Configuration module for Parley.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ManualToolPrompts, Prompts, ResearcherPrompts};
pub use settings::{
    ChatSettings, PromptSettings, ReasoningSettings, ServerSettings, Settings, ToolSettings,
};
