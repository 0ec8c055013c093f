//! Process configuration
//!
//! Loaded once at startup from `agent.config.json` (keys as the original
//! config file spells them), with environment variables as fallback for
//! anything the file leaves out, and passed by parameter into every
//! component that needs it. Missing API keys warn instead of failing so
//! that offline/dry runs still start.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "agent.config.json";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct BochaConfig {
    pub api_key: String,
    pub count: usize,
    pub freshness: String,
    pub summary: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub max_rounds: usize,
    pub concurrency: usize,
}

/// Everything the process needs, resolved to concrete values
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub openai: OpenAiConfig,
    pub bocha: BochaConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    openai: RawOpenAi,
    bocha: RawBocha,
    workflow: RawWorkflow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawOpenAi {
    #[serde(rename = "baseURL", alias = "baseUrl")]
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawBocha {
    api_key: Option<String>,
    count: Option<usize>,
    freshness: Option<String>,
    summary: Option<bool>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawWorkflow {
    max_rounds: Option<usize>,
    concurrency: Option<usize>,
}

impl AgentConfig {
    /// Load from a config file, tolerating its absence. Resolution order per
    /// value: file, then environment, then default.
    pub fn load(path: &Path) -> Result<AgentConfig> {
        let raw = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("config is not valid JSON: {}", path.display()))?
        } else {
            eprintln!(
                "[warn] config file not found at {}; using environment and defaults",
                path.display()
            );
            RawConfig::default()
        };
        Ok(Self::resolve(raw))
    }

    fn resolve(raw: RawConfig) -> AgentConfig {
        let cfg = AgentConfig {
            openai: OpenAiConfig {
                base_url: raw
                    .openai
                    .base_url
                    .or_else(|| env_nonempty("OPENAI_BASE_URL"))
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                api_key: raw
                    .openai
                    .api_key
                    .or_else(|| env_nonempty("OPENAI_API_KEY"))
                    .unwrap_or_default(),
                model: raw
                    .openai
                    .model
                    .or_else(|| env_nonempty("OPENAI_MODEL"))
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
                request_timeout_secs: raw.openai.request_timeout_secs.unwrap_or(300),
            },
            bocha: BochaConfig {
                api_key: raw
                    .bocha
                    .api_key
                    .or_else(|| env_nonempty("BOCHA_API_KEY"))
                    .unwrap_or_default(),
                count: raw.bocha.count.unwrap_or(5).clamp(1, 25),
                freshness: raw
                    .bocha
                    .freshness
                    .unwrap_or_else(|| "noLimit".to_string()),
                summary: raw.bocha.summary.unwrap_or(true),
                request_timeout_secs: raw.bocha.request_timeout_secs.unwrap_or(300),
            },
            workflow: WorkflowConfig {
                max_rounds: raw
                    .workflow
                    .max_rounds
                    .or_else(|| env_usize("WORKFLOW_MAX_ROUNDS"))
                    .unwrap_or(8),
                concurrency: raw
                    .workflow
                    .concurrency
                    .or_else(|| env_usize("WORKFLOW_CONCURRENCY"))
                    .unwrap_or(3)
                    .max(1),
            },
        };

        if cfg.openai.api_key.is_empty() {
            eprintln!("[warn] OpenAI API key is empty. Set agent.config.json or OPENAI_API_KEY.");
        }
        if cfg.bocha.api_key.is_empty() {
            eprintln!("[warn] Bocha API key is empty. Set agent.config.json or BOCHA_API_KEY.");
        }
        cfg
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_usize(key: &str) -> Option<usize> {
    env_nonempty(key).and_then(|v| v.trim().parse().ok())
}
