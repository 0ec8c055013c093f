//! Data structures for the persisted plan document

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved `latest_batch` value marking the final round. Once the check list
/// carries it, no further rounds run.
pub const FINAL_BATCH: i64 = -1;

/// Closed set of task kinds. The planner contract only allows `search` and
/// `summary`; `start` exists solely for the bootstrap node carrying the
/// user's question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Start,
    Search,
    Summary,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Start => "start",
            TaskKind::Search => "search",
            TaskKind::Summary => "summary",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node lifecycle as persisted. A running task is not a persisted state; a
/// node goes from `planned` to `completed` by write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Planned,
    Completed,
}

/// One unit of investigation in the plan graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    pub node_id: String,
    pub title: String,
    pub summary: String,
    pub info: String,
    /// Reference expression naming the parent node(s) that seeded this task
    pub p_node: String,
    /// Round number this node belongs to, or [`FINAL_BATCH`]
    pub batch: i64,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The mutable working set consumed by the next planning step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckList {
    pub latest_id: String,
    pub latest_batch: i64,
    #[serde(default)]
    pub refs: Vec<String>,
    #[serde(default)]
    pub note: String,
}

/// Result of executing one task, to be merged into its node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeResult {
    pub summary: String,
    pub info: String,
}

/// The persisted aggregate root: provenance metadata, the append-only node
/// sequence, and the check list feeding the next round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    pub version: String,
    pub workflow_id: String,
    pub created_at: DateTime<Utc>,
    pub check_list: CheckList,
    pub nodes: Vec<PlanNode>,
}

impl PlanDocument {
    /// Fresh document seeded from a user query: one completed `start` node
    /// with the query as its title, empty refs. Batch 0 is reserved for the
    /// start node so the first planned round is batch 1.
    pub fn new_from_query(query: &str) -> Self {
        let created = Utc::now();
        let workflow_id = format!("workflow-{}", created.format("%Y%m%dT%H%M%S%3fZ"));
        PlanDocument {
            version: "0.1".to_string(),
            workflow_id,
            created_at: created,
            check_list: CheckList {
                latest_id: "a".to_string(),
                latest_batch: 0,
                refs: Vec::new(),
                note: String::new(),
            },
            nodes: vec![PlanNode {
                node_id: "a".to_string(),
                title: query.trim().to_string(),
                summary: String::new(),
                info: String::new(),
                p_node: String::new(),
                batch: 0,
                kind: TaskKind::Start,
                status: NodeStatus::Completed,
                updated_at: None,
            }],
        }
    }

    /// Case-insensitive node lookup
    pub fn find_node(&self, node_id: &str) -> Option<&PlanNode> {
        self.nodes
            .iter()
            .find(|n| n.node_id.eq_ignore_ascii_case(node_id.trim()))
    }

    /// The node carrying the user's original question
    pub fn start_node(&self) -> Option<&PlanNode> {
        self.nodes
            .iter()
            .find(|n| n.kind == TaskKind::Start)
            .or_else(|| self.nodes.first())
    }

    /// Whether the check list has reached the final-round sentinel
    pub fn is_final(&self) -> bool {
        self.check_list.latest_batch == FINAL_BATCH
    }

    /// Merge a task result into its node: summary replaces (when non-empty),
    /// info appends with a blank-line separator, status becomes `completed`
    /// and `updated_at` is stamped. Errors if the node does not exist.
    pub fn apply_result(&mut self, node_id: &str, result: &NodeResult) -> Result<()> {
        let node = match self
            .nodes
            .iter_mut()
            .find(|n| n.node_id.eq_ignore_ascii_case(node_id.trim()))
        {
            Some(node) => node,
            None => bail!("node not found: {}", node_id),
        };
        if !result.summary.is_empty() {
            node.summary = result.summary.clone();
        }
        if !result.info.is_empty() {
            if node.info.is_empty() {
                node.info = result.info.clone();
            } else {
                node.info = format!("{}\n\n{}", node.info, result.info);
            }
        }
        node.status = NodeStatus::Completed;
        node.updated_at = Some(Utc::now());
        Ok(())
    }
}
