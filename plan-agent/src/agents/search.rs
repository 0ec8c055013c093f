//! Search executor: web evidence plus model analysis
//!
//! Runs one Bocha web search for the task, then asks the chat model for a
//! cited analysis ending in a `<summary>` block. The payload wraps the model
//! text in `<info type="llm">` and appends an `<info type="search">` block
//! carrying the raw search results as XML, so downstream references can pick
//! either the analysis or the evidence.

use anyhow::{Context, Result};
use plan_agent_sdk::async_trait;
use std::sync::Arc;

use crate::agents::bocha::{format_hits, BochaClient, SearchResponse};
use crate::agents::openai::ChatClient;
use crate::agents::{ExecutorAgent, TaskInput};

const INSTRUCTIONS: &str = r#"You are a fact-checking and retrieval assistant.
- Ground every claim in the provided search results and cite with [ref:X].
- Structure the answer as bullet points followed by a short reasoning paragraph.
- End with exactly one <summary> block of 1-2 sentences stating the overall
  conclusion and how confident it is.
- If the search results suggest a clear next search direction, mention it in
  one closing sentence; otherwise state that there is none.
"#;

pub struct SearchAgent {
    chat: Arc<ChatClient>,
    bocha: Arc<BochaClient>,
}

impl SearchAgent {
    pub fn new(chat: Arc<ChatClient>, bocha: Arc<BochaClient>) -> Self {
        SearchAgent { chat, bocha }
    }
}

#[async_trait]
impl ExecutorAgent for SearchAgent {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn execute(&self, input: &TaskInput) -> Result<String> {
        let search = self
            .bocha
            .web_search(&input.title)
            .await
            .context("search task: web search failed")?;

        let mut question = input.title.clone();
        if !input.context.trim().is_empty() {
            question = format!("{}\n\nReference input:\n{}", question, input.context);
        }
        let user_input = format!(
            "{}\n\nSearch results (cite with [ref:X]):\n{}",
            question,
            format_hits(&search)
        );

        let analysis = self
            .chat
            .chat(INSTRUCTIONS, &user_input)
            .await
            .context("search task: analysis call failed")?;

        Ok(assemble_payload(&analysis, &search))
    }
}

/// Wrap the model reply in an llm info block (closing it before any
/// `<summary>` the model emitted) and append the search evidence block.
fn assemble_payload(analysis: &str, search: &SearchResponse) -> String {
    let lower = analysis.to_ascii_lowercase();
    let body = match lower.find("<summary") {
        Some(pos) => format!(
            "<info type=\"llm\">{}</info>\n{}",
            &analysis[..pos],
            &analysis[pos..]
        ),
        None => format!("<info type=\"llm\">{}</info>", analysis),
    };
    format!("{}\n\n{}", body, build_search_xml(search))
}

fn build_search_xml(search: &SearchResponse) -> String {
    let mut parts = Vec::new();
    parts.push("<info type=\"search\">".to_string());
    parts.push("  <searches>".to_string());
    parts.push(format!(
        "    <search step=\"1\" query=\"{}\" total=\"{}\">",
        escape_attr(&search.query),
        search.total
    ));
    for hit in &search.hits {
        parts.push(format!(
            "      <result ref=\"{}\" title=\"{}\" url=\"{}\" siteName=\"{}\" date=\"{}\">",
            hit.reference,
            escape_attr(&hit.title),
            escape_attr(&hit.url),
            escape_attr(&hit.site_name),
            escape_attr(&hit.date)
        ));
        parts.push(format!("        <summary>{}</summary>", cdata(&hit.summary)));
        parts.push("      </result>".to_string());
    }
    parts.push("    </search>".to_string());
    parts.push("  </searches>".to_string());
    parts.push("</info>".to_string());
    parts.join("\n")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
