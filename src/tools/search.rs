//! Web search through the Tavily API.

use super::{list_param, str_param, ParamKind, ParamSpec, Tool, ToolContext, ToolDeclaration};
use crate::config::ToolSettings;
use crate::error::{ParleyError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily rejects fewer than this many results.
const MIN_RESULTS: i64 = 5;

pub struct SearchTool {
    declaration: ToolDeclaration,
    http: reqwest::Client,
    api_key: Option<String>,
    default_max_results: i64,
    search_depth: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: i64,
    search_depth: &'a str,
    include_domains: Vec<String>,
    exclude_domains: Vec<String>,
    include_answer: bool,
    include_images: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    images: Vec<Value>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize, Serialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchTool {
    pub fn new(http: reqwest::Client, settings: &ToolSettings) -> Result<Self> {
        let declaration = ToolDeclaration::new(
            "search",
            "Search the web for current information",
            vec![
                ParamSpec::required("query", ParamKind::Text, "The query to search for"),
                ParamSpec::optional(
                    "max_results",
                    ParamKind::Integer { min: None, max: None },
                    "The maximum number of results to return",
                ),
                ParamSpec::optional(
                    "include_domains",
                    ParamKind::TextList,
                    "A list of domains to specifically include in the search results",
                )
                .with_default(json!([])),
                ParamSpec::optional(
                    "exclude_domains",
                    ParamKind::TextList,
                    "A list of domains to specifically exclude from the search results",
                )
                .with_default(json!([])),
            ],
        )?;

        Ok(Self {
            declaration,
            http,
            api_key: settings.tavily_api_key.clone(),
            default_max_results: i64::from(settings.search_max_results),
            search_depth: settings.search_depth.clone(),
        })
    }

    fn build_request<'a>(&'a self, params: &'a Map<String, Value>) -> Result<TavilyRequest<'a>> {
        let requested = params
            .get("max_results")
            .and_then(Value::as_i64)
            .unwrap_or(self.default_max_results);

        Ok(TavilyRequest {
            query: str_param(params, "query")?,
            max_results: requested.max(MIN_RESULTS),
            search_depth: &self.search_depth,
            include_domains: list_param(params, "include_domains"),
            exclude_domains: list_param(params, "exclude_domains"),
            include_answer: true,
            include_images: true,
        })
    }
}

fn shape_results(query: &str, response: TavilyResponse) -> Value {
    let count = response.results.len();
    json!({
        "query": query,
        "answer": response.answer,
        "images": response.images,
        "results": response.results,
        "number_of_results": count,
    })
}

#[async_trait]
impl Tool for SearchTool {
    fn declaration(&self) -> &ToolDeclaration {
        &self.declaration
    }

    async fn execute(&self, params: &Map<String, Value>, _ctx: ToolContext<'_>) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ParleyError::Tool("TAVILY_API_KEY is not set".to_string()))?;
        let request = self.build_request(params)?;
        debug!(query = %request.query, max_results = request.max_results, "Tavily search");

        let response = self
            .http
            .post(TAVILY_SEARCH_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<TavilyResponse>()
            .await?;

        Ok(shape_results(request.query, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> SearchTool {
        SearchTool::new(reqwest::Client::new(), &ToolSettings::default()).unwrap()
    }

    #[test]
    fn test_request_floor_and_defaults() {
        let tool = tool();
        let params = tool
            .declaration()
            .validate(json!({"query": "rust", "max_results": 2}).as_object().unwrap())
            .unwrap();
        let request = tool.build_request(&params).unwrap();
        assert_eq!(request.query, "rust");
        assert_eq!(request.max_results, 5);
        assert!(request.include_domains.is_empty());

        let params = tool
            .declaration()
            .validate(json!({"query": "rust", "include_domains": ["docs.rs"]}).as_object().unwrap())
            .unwrap();
        let request = tool.build_request(&params).unwrap();
        assert_eq!(request.max_results, 10);
        assert_eq!(request.include_domains, vec!["docs.rs".to_string()]);
        assert_eq!(request.search_depth, "basic");

        let params = tool
            .declaration()
            .validate(json!({"query": "rust", "max_results": 25}).as_object().unwrap())
            .unwrap();
        assert_eq!(tool.build_request(&params).unwrap().max_results, 25);
    }

    #[test]
    fn test_shape_results() {
        let response: TavilyResponse = serde_json::from_value(json!({
            "answer": "42",
            "results": [{"title": "T", "url": "https://a.b", "content": "c", "score": 0.9}]
        }))
        .unwrap();
        let shaped = shape_results("q", response);
        assert_eq!(shaped["number_of_results"], json!(1));
        assert_eq!(shaped["results"][0]["url"], json!("https://a.b"));
        assert_eq!(shaped["images"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_key_is_a_tool_error() {
        let tool = tool();
        let conversation = crate::llm::Conversation::default();
        let params = json!({"query": "rust"}).as_object().unwrap().clone();
        let err = tool
            .execute(&params, ToolContext { conversation: &conversation })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }
}
