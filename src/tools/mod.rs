//! Tools the model can call: web search, page retrieval, video search.

mod retrieve;
mod schema;
mod search;
mod video;

pub use retrieve::RetrieveTool;
pub use schema::{ParamKind, ParamSpec, ToolDeclaration};
pub use search::SearchTool;
pub use video::VideoSearchTool;

use crate::config::ToolSettings;
use crate::error::{ParleyError, Result};
use crate::llm::{Conversation, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Per-call view of the request a tool runs in.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub conversation: &'a Conversation,
}

/// A named capability with a declared parameter schema.
#[async_trait]
pub trait Tool: Send + Sync {
    fn declaration(&self) -> &ToolDeclaration;

    /// Run with parameters that already passed [`ToolDeclaration::validate`].
    async fn execute(&self, params: &Map<String, Value>, ctx: ToolContext<'_>) -> Result<Value>;
}

/// The fixed set of tools known at startup.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// `search`, `retrieve` and `videoSearch` sharing one HTTP client.
    pub fn from_settings(settings: &ToolSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self::new(vec![
            Arc::new(SearchTool::new(http.clone(), settings)?),
            Arc::new(RetrieveTool::new(http.clone(), settings)?),
            Arc::new(VideoSearchTool::new(http, settings)?),
        ]))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.declaration().name == name)
    }

    pub fn declaration(&self, name: &str) -> Option<&ToolDeclaration> {
        self.get(name).map(|t| t.declaration())
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration())
    }

    /// Native-calling schemas for every tool.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.declarations().map(ToolDeclaration::to_spec).collect()
    }

    /// Tool list inserted into the manual-call instructions.
    pub fn describe(&self) -> String {
        self.declarations()
            .map(ToolDeclaration::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Validate and run one call. Failures come back as `{"error": …}` so
    /// the model can see them.
    #[instrument(skip(self, params, ctx), fields(tool = %name))]
    pub async fn execute(
        &self,
        name: &str,
        params: Option<&Map<String, Value>>,
        ctx: ToolContext<'_>,
    ) -> Value {
        match self.try_execute(name, params, ctx).await {
            Ok(value) => {
                info!("Tool completed");
                value
            }
            Err(e) => {
                warn!(error = %e, "Tool failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    /// Like [`execute`](Self::execute) for a native call's raw JSON arguments.
    pub async fn execute_json(&self, name: &str, arguments: &str, ctx: ToolContext<'_>) -> Value {
        let parsed = if arguments.trim().is_empty() {
            Ok(Map::new())
        } else {
            serde_json::from_str::<Map<String, Value>>(arguments)
        };
        match parsed {
            Ok(params) => self.execute(name, Some(&params), ctx).await,
            Err(e) => {
                warn!(tool = %name, error = %e, "Unparseable tool arguments");
                json!({ "error": format!("invalid arguments: {}", e) })
            }
        }
    }

    async fn try_execute(
        &self,
        name: &str,
        params: Option<&Map<String, Value>>,
        ctx: ToolContext<'_>,
    ) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| ParleyError::Tool(format!("unknown tool `{}`", name)))?;
        let empty = Map::new();
        let validated = tool
            .declaration()
            .validate(params.unwrap_or(&empty))
            .map_err(|e| ParleyError::Tool(format!("{}: {}", name, e)))?;
        tool.execute(&validated, ctx).await
    }
}

pub(crate) fn str_param<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ParleyError::Tool(format!("missing `{}`", name)))
}

pub(crate) fn list_param(params: &Map<String, Value>, name: &str) -> Vec<String> {
    params
        .get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records calls and echoes its parameters back.
    pub struct EchoTool {
        declaration: ToolDeclaration,
        pub calls: Mutex<Vec<Map<String, Value>>>,
    }

    impl EchoTool {
        pub fn new(name: &str) -> Self {
            Self {
                declaration: ToolDeclaration::new(
                    name,
                    "Echo the query",
                    vec![ParamSpec::required("query", ParamKind::Text, "What to echo")],
                )
                .unwrap(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn declaration(&self) -> &ToolDeclaration {
            &self.declaration
        }

        async fn execute(&self, params: &Map<String, Value>, _ctx: ToolContext<'_>) -> Result<Value> {
            self.calls.lock().unwrap().push(params.clone());
            Ok(json!({ "echo": params["query"] }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::EchoTool;
    use super::*;

    #[tokio::test]
    async fn test_execute_validates_before_running() {
        let echo = Arc::new(EchoTool::new("search"));
        let tools = ToolSet::new(vec![echo.clone() as Arc<dyn Tool>]);
        let conversation = Conversation::default();
        let ctx = ToolContext { conversation: &conversation };

        let result = tools.execute("search", None, ctx).await;
        assert!(result["error"].as_str().unwrap().contains("missing required parameter"));
        assert!(echo.calls.lock().unwrap().is_empty());

        let result = tools.execute_json("search", r#"{"query":"hi"}"#, ctx).await;
        assert_eq!(result, json!({"echo": "hi"}));
        assert_eq!(echo.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_json() {
        let tools = ToolSet::new(vec![Arc::new(EchoTool::new("search"))]);
        let conversation = Conversation::default();
        let ctx = ToolContext { conversation: &conversation };

        let result = tools.execute("nope", None, ctx).await;
        assert!(result["error"].as_str().unwrap().contains("unknown tool"));

        let result = tools.execute_json("search", "{not json", ctx).await;
        assert!(result["error"].as_str().unwrap().starts_with("invalid arguments"));
    }

    #[test]
    fn test_builtin_set() {
        let tools = ToolSet::from_settings(&ToolSettings::default()).unwrap();
        let names: Vec<_> = tools.declarations().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["search", "retrieve", "videoSearch"]);
        assert_eq!(tools.specs().len(), 3);
        assert!(tools.describe().contains("- videoSearch:"));
    }
}
