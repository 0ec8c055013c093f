//! Bocha web-search API client

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::time::Duration;

use crate::config::BochaConfig;

const ENDPOINT: &str = "https://api.bochaai.com/v1/web-search";

/// One web-search hit, numbered for citation
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub reference: usize,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub site_name: String,
    pub date: String,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone)]
pub struct BochaClient {
    http: reqwest::Client,
    api_key: String,
    count: usize,
    freshness: String,
    summary: bool,
}

impl BochaClient {
    pub fn new(cfg: &BochaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(BochaClient {
            http,
            api_key: cfg.api_key.clone(),
            count: cfg.count.clamp(1, 25),
            freshness: cfg.freshness.clone(),
            summary: cfg.summary,
        })
    }

    pub async fn web_search(&self, query: &str) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            bail!("web search: query is required");
        }
        let body = json!({
            "query": query,
            "freshness": self.freshness,
            "summary": self.summary,
            "count": self.count,
        });

        let response = self
            .http
            .post(ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("web search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "web search HTTP {}: {}",
                status.as_u16(),
                text.chars().take(500).collect::<String>()
            );
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .context("web search response was not JSON")?;
        // Expected shape:
        // { code, data: { webPages: { value: [ { name, url, summary, siteName, dateLastCrawled } ] } } }
        let pages = reply["data"]["webPages"]["value"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let hits: Vec<SearchHit> = pages
            .iter()
            .enumerate()
            .map(|(i, p)| SearchHit {
                reference: i + 1,
                title: str_field(p, "name"),
                url: str_field(p, "url"),
                summary: str_field(p, "summary"),
                site_name: str_field(p, "siteName"),
                date: str_field(p, "dateLastCrawled"),
            })
            .collect();

        Ok(SearchResponse {
            query: query.to_string(),
            total: hits.len(),
            hits,
        })
    }
}

fn str_field(value: &serde_json::Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

/// Compact JSON rendering of hits for the model to cite with `[ref:X]`
pub fn format_hits(response: &SearchResponse) -> String {
    let rendered: Vec<serde_json::Value> = response
        .hits
        .iter()
        .map(|h| {
            json!({
                "ref": h.reference,
                "title": h.title,
                "url": h.url,
                "summary": h.summary,
                "siteName": h.site_name,
                "date": h.date,
            })
        })
        .collect();
    serde_json::Value::Array(rendered).to_string()
}
