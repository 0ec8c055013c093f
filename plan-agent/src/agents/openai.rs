//! Minimal OpenAI-compatible chat completions client

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::time::Duration;

use crate::config::OpenAiConfig;

/// Shared chat client. HTTP status codes are carried in error messages so
/// the retry layer can classify 429s and timeouts by substring.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(cfg: &OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(ChatClient {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }

    /// One system+user chat turn, returning the assistant's text
    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "chat completion HTTP {}: {}",
                status.as_u16(),
                truncate(&text, 500)
            );
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .context("chat completion response was not JSON")?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .context("chat completion response missing message content")?;
        Ok(content.to_string())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
