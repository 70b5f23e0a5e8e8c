//! Blocking HTTP transport for a chat-completions endpoint.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::config::RunConfig;
use crate::models::ChatMessage;

use super::client::SuggestionTransport;

const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpTransport {
    /// Build the transport from run configuration. The API key comes from
    /// the environment variable the config names, never from the config
    /// file itself.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env).with_context(|| {
            format!(
                "API key not found: set the {} environment variable",
                config.api_key_env
            )
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("atlas/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
        })
    }
}

impl SuggestionTransport for HttpTransport {
    fn send(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        let status = response.status();
        let text = response.text().context("Failed to read response body")?;
        if !status.is_success() {
            bail!("suggestion endpoint returned {status}: {}", snippet(&text));
        }

        let value: Value =
            serde_json::from_str(&text).context("Suggestion endpoint returned a non-JSON body")?;
        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .context("Suggestion response is missing choices[0].message.content")?;
        Ok(content.to_string())
    }
}

/// First part of an error body, enough to diagnose without dumping pages.
fn snippet(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
