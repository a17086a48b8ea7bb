//! CLI output formatting utilities.

use crate::models::ModelDescriptor;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// One catalog row: identifier, display name, capabilities.
    pub fn model_row(model: &ModelDescriptor, reasoning: bool, tool_model: &str) {
        let marker = if model.enabled {
            style("*").green()
        } else {
            style("-").dim()
        };
        let mut flags = vec![model.tool_call_mode.to_string()];
        if model.is_multimodal() {
            flags.push("multimodal".to_string());
        }
        if reasoning {
            flags.push("reasoning".to_string());
        }

        println!(
            "  {} {} {} [{}]",
            marker,
            style(model.identifier()).bold(),
            style(format!("({})", model.name)).dim(),
            flags.join(", ")
        );
        if tool_model != model.identifier() {
            println!("      {} {}", style("tools via").dim(), tool_model);
        }
    }

    /// Print a tool invocation while an answer streams.
    pub fn tool_call(name: &str, arguments: &str) {
        eprintln!(
            "{} {}({})",
            style("~>").magenta().bold(),
            style(name).bold(),
            content_preview(arguments, 120)
        );
    }

    /// Print reasoning text, dimmed, to stderr.
    pub fn reasoning(text: &str) {
        eprint!("{}", style(text).dim().italic());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Single-line preview, cut at `max_chars` characters.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
