//! Prompt templates for Parley.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub researcher: ResearcherPrompts,
    /// Instructions for models driven through the XML tool-call protocol.
    pub manual_tools: ManualToolPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Base system prompt shared by both tool-calling paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearcherPrompts {
    pub system: String,
}

impl Default for ResearcherPrompts {
    fn default() -> Self {
        Self {
            system: r#"Instructions:

You are a helpful AI assistant with access to real-time web search, content retrieval and video search capabilities.
When asked a question, you should:
1. Search for relevant information using the search tool when needed
2. Use the retrieve tool to get detailed content from specific URLs
3. Use the video search tool when looking for video content
4. Analyze all search results to provide accurate, up-to-date information
5. Always cite sources using the [number](url) format, matching the order of search results. If multiple sources are relevant, include all of them, and comma separate them. Only use information that has a URL available for citation.
6. If results are not relevant or helpful, rely on your general knowledge
7. Provide comprehensive and detailed responses based on search results, ensuring thorough coverage of the user's question
8. Use markdown to structure your responses. Use headings to break up the content into sections.
9. Use the retrieve tool only with user-provided URLs.

Citation Format:
[number](url)"#
                .to_string(),
        }
    }
}

/// Prompts for the manual `<tool_call>` protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualToolPrompts {
    /// Appended to the system prompt; `{{tools}}` expands to the tool list.
    pub instructions: String,
}

impl Default for ManualToolPrompts {
    fn default() -> Self {
        Self {
            instructions: r#"## Tools

You cannot call tools directly. To use a tool, reply with ONLY a tool call block in this exact format and nothing else:

<tool_call><tool>TOOL_NAME</tool><parameters><PARAMETER_NAME>value</PARAMETER_NAME></parameters></tool_call>

Rules:
- List parameters take comma-separated values, e.g. <include_domains>example.com, docs.rs</include_domains>
- Omit optional parameters you do not need
- After a tool call you will receive the result in a <tool_result> block; you may then call another tool or answer
- When you have enough information, answer the user directly without any tool call block

Available tools:

{{tools}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let researcher_path = custom_path.join("researcher.toml");
            if researcher_path.exists() {
                let content = std::fs::read_to_string(&researcher_path)?;
                prompts.researcher = toml::from_str(&content)?;
            }

            let manual_path = custom_path.join("manual_tools.toml");
            if manual_path.exists() {
                let content = std::fs::read_to_string(&manual_path)?;
                prompts.manual_tools = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Researcher system prompt stamped with the current date and time.
    pub fn researcher_system(&self, now: chrono::DateTime<chrono::Local>) -> String {
        let base = self.render_with_custom(&self.researcher.system, &HashMap::new());
        format!(
            "{}\nCurrent date and time: {}",
            base,
            now.format("%Y-%m-%d %H:%M:%S")
        )
    }

    /// Manual-protocol instructions listing the given tool descriptions.
    pub fn manual_tool_instructions(&self, tool_descriptions: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("tools".to_string(), tool_descriptions.to_string());
        self.render_with_custom(&self.manual_tools.instructions, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.researcher.system.is_empty());
        assert!(prompts.manual_tools.instructions.contains("{{tools}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_researcher_system_has_date() {
        let prompts = Prompts::default();
        let now = chrono::Local.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let system = prompts.researcher_system(now);
        assert!(system.ends_with("Current date and time: 2025-03-01 09:30:00"));
    }

    #[test]
    fn test_manual_instructions_list_tools() {
        let prompts = Prompts::default();
        let text = prompts.manual_tool_instructions("- search: find things");
        assert!(text.contains("- search: find things"));
        assert!(!text.contains("{{tools}}"));
    }

    #[test]
    fn test_custom_dir_overrides_researcher() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("researcher.toml"),
            "system = \"You are terse. Team: {{team}}\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("team".to_string(), "infra".to_string());
        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();

        let now = chrono::Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(prompts
            .researcher_system(now)
            .starts_with("You are terse. Team: infra"));
        assert!(prompts.manual_tools.instructions.contains("<tool_call>"));
    }
}
