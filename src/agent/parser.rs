//! Parser for tool calls written as XML-tagged text.
//!
//! Models without structured tool calling are asked to answer with
//! `<tool_call><tool>NAME</tool><parameters>…</parameters></tool_call>`.
//! Parsing never fails: malformed input degrades to "no tool" or to a tool
//! name without parameters, and `search` gets a usable default query.

use crate::tools::{ToolDeclaration, ToolSet};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static TOOL_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tool_call>(.*?)</tool_call>").expect("valid regex"));
static TOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tool>(.*?)</tool>").expect("valid regex"));
static PARAMETERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<parameters>(.*?)</parameters>").expect("valid regex"));

/// Query used when a `search` call cannot be salvaged.
pub const FALLBACK_SEARCH_QUERY: &str = "general search";

/// A tool invocation decoded from model text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedToolCall {
    /// Empty when the text holds no usable call.
    pub tool: String,
    /// Validated parameters, when any could be assembled.
    pub parameters: Option<Map<String, Value>>,
}

impl ParsedToolCall {
    fn named(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            parameters: None,
        }
    }

    /// The model answered directly.
    pub fn is_noop(&self) -> bool {
        self.tool.is_empty()
    }
}

fn tag_content<'t>(pattern: &Regex, text: &'t str) -> &'t str {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or("")
}

/// Decode the first tool call in `text`.
pub fn parse_tool_call(text: &str, tools: &ToolSet) -> ParsedToolCall {
    let block = tag_content(&TOOL_CALL_RE, text);
    if block.is_empty() {
        debug!("No tool_call block in model output");
        return ParsedToolCall::default();
    }

    let tool = tag_content(&TOOL_RE, block);
    if tool.is_empty() {
        return ParsedToolCall::default();
    }

    let parameters_xml = tag_content(&PARAMETERS_RE, block);
    if parameters_xml.is_empty() {
        return ParsedToolCall::named(tool);
    }

    let Some(declaration) = tools.declaration(tool) else {
        warn!(%tool, "Model called an undeclared tool");
        return ParsedToolCall::named(tool);
    };

    decode_parameters(declaration, parameters_xml)
}

fn decode_parameters(declaration: &ToolDeclaration, parameters_xml: &str) -> ParsedToolCall {
    let raw = declaration.extract(parameters_xml);
    match declaration.validate(&raw) {
        Ok(parameters) => ParsedToolCall {
            tool: declaration.name.clone(),
            parameters: Some(parameters),
        },
        Err(e) => {
            warn!(tool = %declaration.name, error = %e, "Invalid tool parameters");
            if declaration.name == "search" {
                if let Some(call) = search_defaults(declaration, &raw) {
                    return call;
                }
            }
            ParsedToolCall::named(&declaration.name)
        }
    }
}

fn search_defaults(declaration: &ToolDeclaration, raw: &Map<String, Value>) -> Option<ParsedToolCall> {
    let query = raw
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.is_empty())
        .unwrap_or(FALLBACK_SEARCH_QUERY);

    let mut defaults = Map::new();
    defaults.insert("query".to_string(), json!(query));
    defaults.insert("include_domains".to_string(), json!([]));
    defaults.insert("exclude_domains".to_string(), json!([]));

    match declaration.validate(&defaults) {
        Ok(parameters) => Some(ParsedToolCall {
            tool: declaration.name.clone(),
            parameters: Some(parameters),
        }),
        Err(e) => {
            warn!(error = %e, "Could not build default search parameters");
            None
        }
    }
}
