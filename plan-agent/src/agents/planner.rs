//! Planning agent backed by an OpenAI-compatible chat model
//!
//! The model receives the user's objective, the persisted progress note and
//! the resolved check-list values, and must reply with strict JSON matching
//! [`PlannerOutput`]. Markdown code fences around the JSON are tolerated;
//! anything else is a contract violation and fatal for the round.

use anyhow::{Context, Result};
use plan_agent_sdk::async_trait;
use std::sync::Arc;

use crate::agents::openai::ChatClient;
use crate::agents::{PlannerAgent, PlannerInput, PlannerOutput};

const INSTRUCTIONS: &str = r#"You are a planning assistant for an iterative research workflow.
Goal: given the reference inputs, plan the next batch of tasks (0-3) and the next check_list.

Reply with strict JSON only (no prose, no code fences, no comments):
{
  "is_final": boolean,
  "tasks": [ { "title": string, "type": "search" | "summary", "p_node": string } ],
  "next_check_list": [string],
  "note": string
}

Field constraints:
- tasks: at most 3, possibly 0. Titles must be clear and specific.
- type: "search" (gather facts and evidence) or "summary" (consolidate and conclude).
- p_node: parent reference(s); format "id:summary" or "id:info[llm|search|all]";
  multiple sources comma-separated, e.g. "b:summary, c:summary".
- next_check_list: may reference existing nodes (e.g. "a:summary") and this
  round's new tasks via placeholders NEW1/NEW2/NEW3 for tasks[0..2],
  e.g. "NEW1:summary".
- note: one short progress note per investigation direction.

Planning strategy:
- If the available information already supports a final conclusion, set
  is_final=true and create exactly one summary task aggregating the valuable
  upstream nodes.
- If information gaps remain, prefer 1-2 targeted search tasks; avoid
  duplicating directions already covered.
- Point new tasks' p_node at the most informative upstream content, typically
  "x:info[search]" plus key summaries.
- An empty tasks list is allowed when there is nothing useful left to do.
"#;

pub struct OpenAiPlanner {
    chat: Arc<ChatClient>,
}

impl OpenAiPlanner {
    pub fn new(chat: Arc<ChatClient>) -> Self {
        OpenAiPlanner { chat }
    }
}

#[async_trait]
impl PlannerAgent for OpenAiPlanner {
    async fn plan(&self, input: &PlannerInput) -> Result<PlannerOutput> {
        let user_input = compose_input(input);
        let reply = self
            .chat
            .chat(INSTRUCTIONS, &user_input)
            .await
            .context("planning call failed")?;
        parse_planner_output(&reply)
    }
}

fn compose_input(input: &PlannerInput) -> String {
    let mut sections = Vec::new();
    if !input.objective.trim().is_empty() {
        sections.push(format!("User question:\n{}", input.objective.trim()));
    }
    if !input.note.trim().is_empty() {
        sections.push(format!("Current investigation note:\n{}", input.note.trim()));
    }
    let mut refs = vec!["Reference inputs (check_list values):".to_string()];
    for (i, r) in input.inputs.iter().enumerate() {
        refs.push(format!("#{} {} ->\n{}", i + 1, r.expr, r.value));
    }
    sections.push(refs.join("\n\n"));
    sections.join("\n\n")
}

/// Parse the model's reply into the planner contract. Fatal on violation.
pub fn parse_planner_output(reply: &str) -> Result<PlannerOutput> {
    let json = extract_json(reply);
    let output: PlannerOutput =
        serde_json::from_str(&json).context("planner output does not match contract")?;
    output.validate()?;
    Ok(output)
}

/// Strip markdown code fences around a JSON object, if present
fn extract_json(text: &str) -> String {
    let body = if text.contains("```json") {
        let start = text.find("```json").map(|p| p + 7).unwrap_or(0);
        let end = text[start..]
            .rfind("```")
            .map(|pos| pos + start)
            .unwrap_or(text.len());
        &text[start..end]
    } else if text.contains("```") {
        let start = text.find("```").map(|p| p + 3).unwrap_or(0);
        let end = text[start..]
            .rfind("```")
            .map(|pos| pos + start)
            .unwrap_or(text.len());
        &text[start..end]
    } else {
        text
    };
    body.trim().to_string()
}
