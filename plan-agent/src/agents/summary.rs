//! Summary executor: condense resolved context into one `<summary>` block

use anyhow::{Context, Result};
use plan_agent_sdk::async_trait;
use std::sync::Arc;

use crate::agents::openai::ChatClient;
use crate::agents::{ExecutorAgent, TaskInput};
use crate::plan::blocks::extract_summary;

const INSTRUCTIONS: &str = r#"You are a summarization assistant.
- The input is a block of text, possibly containing XML fragments and citation markers.
- Produce a single <summary>...</summary> node of 1-2 sentences stating the
  overall conclusion and how reliable it is.
- Output strictly that one <summary> node and nothing else.
"#;

pub struct SummaryAgent {
    chat: Arc<ChatClient>,
}

impl SummaryAgent {
    pub fn new(chat: Arc<ChatClient>) -> Self {
        SummaryAgent { chat }
    }
}

#[async_trait]
impl ExecutorAgent for SummaryAgent {
    fn name(&self) -> &'static str {
        "summary"
    }

    async fn execute(&self, input: &TaskInput) -> Result<String> {
        let text = if input.context.trim().is_empty() {
            input.title.clone()
        } else {
            input.context.clone()
        };
        let reply = self
            .chat
            .chat(INSTRUCTIONS, &text)
            .await
            .context("summary task: model call failed")?;
        Ok(ensure_summary_block(&reply))
    }
}

/// Keep only the `<summary>` node from the reply; if the model strayed, wrap
/// its first sentences instead.
fn ensure_summary_block(reply: &str) -> String {
    if let Some(block) = extract_summary(reply) {
        return block.to_string();
    }
    let stripped = strip_tags(reply);
    let condensed = first_sentences(&stripped, 2);
    if condensed.is_empty() {
        "<summary>(no summary)</summary>".to_string()
    } else {
        format!("<summary>{}</summary>", condensed)
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn first_sentences(text: &str, count: usize) -> String {
    text.split(['.', '!', '?', '。', '！', '？'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(count)
        .collect::<Vec<_>>()
        .join(". ")
}
