//! CLI module for Parley.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Parley - a research chat backend for hosted LLMs
///
/// Routes conversations to the configured model providers, calls web search
/// and retrieval tools on the model's behalf, and streams the answer back.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP chat server
    Serve {
        /// Host to bind to (defaults to server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question and stream the answer to the terminal
    Ask {
        /// The question to ask
        prompt: String,

        /// Model identifier, e.g. openai:gpt-4o-mini
        #[arg(short, long)]
        model: Option<String>,

        /// Let the model search the web
        #[arg(short, long)]
        search: bool,

        /// Print the model's thinking for reasoning models
        #[arg(long)]
        show_reasoning: bool,
    },

    /// List catalog models and whether their provider is configured
    Models {
        /// Only show models whose provider is configured
        #[arg(long)]
        available: bool,
    },

    /// Check provider credentials, tool keys and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file if none exists
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["parley", "-vv", "ask", "what is rust?", "-m", "openai:gpt-4o", "--search"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { prompt, model, search, show_reasoning } => {
                assert_eq!(prompt, "what is rust?");
                assert_eq!(model.as_deref(), Some("openai:gpt-4o"));
                assert!(search);
                assert!(!show_reasoning);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["parley", "serve"]);
        assert!(matches!(cli.command, Commands::Serve { host: None, port: None }));
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
