//! Video search through the Serper API.

use super::{str_param, ParamKind, ParamSpec, Tool, ToolContext, ToolDeclaration};
use crate::config::ToolSettings;
use crate::error::{ParleyError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

const SERPER_VIDEOS_URL: &str = "https://google.serper.dev/videos";

pub struct VideoSearchTool {
    declaration: ToolDeclaration,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl VideoSearchTool {
    pub fn new(http: reqwest::Client, settings: &ToolSettings) -> Result<Self> {
        let declaration = ToolDeclaration::new(
            "videoSearch",
            "Search for videos from YouTube",
            vec![ParamSpec::required("query", ParamKind::Text, "The query to search for")],
        )?;

        Ok(Self {
            declaration,
            http,
            api_key: settings.serper_api_key.clone(),
        })
    }
}

#[async_trait]
impl Tool for VideoSearchTool {
    fn declaration(&self) -> &ToolDeclaration {
        &self.declaration
    }

    async fn execute(&self, params: &Map<String, Value>, _ctx: ToolContext<'_>) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ParleyError::Tool("SERPER_API_KEY is not set".to_string()))?;
        let query = str_param(params, "query")?;
        debug!(%query, "Serper video search");

        let response = self
            .http
            .post(SERPER_VIDEOS_URL)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Conversation;

    #[tokio::test]
    async fn test_missing_key_is_a_tool_error() {
        let tool = VideoSearchTool::new(reqwest::Client::new(), &ToolSettings::default()).unwrap();
        assert_eq!(tool.declaration().name, "videoSearch");

        let conversation = Conversation::default();
        let params = json!({"query": "rust talks"}).as_object().unwrap().clone();
        let err = tool
            .execute(&params, ToolContext { conversation: &conversation })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }
}
