//! OpenAI-compatible client construction with sensible defaults.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

use crate::error::Result;

/// Default timeout for a single chat-completion request (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client for an OpenAI-compatible endpoint.
///
/// `api_base` is the URL prefix that `/chat/completions` is appended to.
pub fn create_client(api_base: &str, api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
