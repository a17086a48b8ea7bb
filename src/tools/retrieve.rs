//! Page retrieval through the Jina Reader API.

use super::{str_param, ParamKind, ParamSpec, Tool, ToolContext, ToolDeclaration};
use crate::config::ToolSettings;
use crate::error::{ParleyError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

const JINA_READER_URL: &str = "https://r.jina.ai/";

pub struct RetrieveTool {
    declaration: ToolDeclaration,
    http: reqwest::Client,
    api_key: Option<String>,
    max_chars: usize,
}

#[derive(Debug, Deserialize)]
struct ReaderResponse {
    data: ReaderPage,
}

#[derive(Debug, Deserialize)]
struct ReaderPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl RetrieveTool {
    pub fn new(http: reqwest::Client, settings: &ToolSettings) -> Result<Self> {
        let declaration = ToolDeclaration::new(
            "retrieve",
            "Retrieve content from a URL the user provided",
            vec![ParamSpec::required("url", ParamKind::Url, "The URL to retrieve")],
        )?;

        Ok(Self {
            declaration,
            http,
            api_key: settings.jina_api_key.clone(),
            max_chars: settings.retrieve_max_chars,
        })
    }
}

/// Only URLs that appear in the user's own messages may be fetched.
fn check_user_provided(url: &str, ctx: ToolContext<'_>) -> Result<()> {
    if ctx.conversation.user_mentions(url) {
        Ok(())
    } else {
        Err(ParleyError::Tool(format!(
            "retrieve only accepts URLs from the user's messages: {}",
            url
        )))
    }
}

fn shape_page(page: ReaderPage, max_chars: usize) -> Value {
    let content: String = page.content.chars().take(max_chars).collect();
    json!({
        "query": "",
        "images": [],
        "results": [{
            "title": page.title,
            "url": page.url,
            "content": content,
        }],
    })
}

#[async_trait]
impl Tool for RetrieveTool {
    fn declaration(&self) -> &ToolDeclaration {
        &self.declaration
    }

    async fn execute(&self, params: &Map<String, Value>, ctx: ToolContext<'_>) -> Result<Value> {
        let url = str_param(params, "url")?;
        check_user_provided(url, ctx)?;
        debug!(%url, "Jina retrieve");

        let mut request = self
            .http
            .get(format!("{}{}", JINA_READER_URL, url))
            .header("Accept", "application/json")
            .header("X-With-Generated-Alt", "true");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await?
            .error_for_status()?
            .json::<ReaderResponse>()
            .await?;

        Ok(shape_page(response.data, self.max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Conversation, Message};

    #[test]
    fn test_only_user_urls_are_allowed() {
        let conversation = Conversation::new(vec![
            Message::user("Summarize https://example.com/post please"),
            Message::assistant("You might also like https://other.example/"),
        ]);
        let ctx = ToolContext { conversation: &conversation };

        assert!(check_user_provided("https://example.com/post", ctx).is_ok());
        assert!(check_user_provided("https://other.example/", ctx).is_err());
        assert!(check_user_provided("https://example.com/secret", ctx).is_err());
    }

    #[tokio::test]
    async fn test_rejected_before_any_request() {
        let tool = RetrieveTool::new(reqwest::Client::new(), &ToolSettings::default()).unwrap();
        let conversation = Conversation::new(vec![Message::user("hello")]);
        let params = json!({"url": "https://example.com/"}).as_object().unwrap().clone();
        let err = tool
            .execute(&params, ToolContext { conversation: &conversation })
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Tool(_)));
    }

    #[test]
    fn test_shape_page_truncates() {
        let page = ReaderPage {
            title: "T".to_string(),
            url: "https://example.com".to_string(),
            content: "héllo world".to_string(),
        };
        let shaped = shape_page(page, 5);
        assert_eq!(shaped["results"][0]["content"], json!("héllo"));
        assert_eq!(shaped["results"][0]["title"], json!("T"));
    }
}
