//! External collaborator boundary: planning and execution agents
//!
//! The orchestrator only ever talks to these traits. Live implementations
//! call an OpenAI-compatible chat endpoint (and the Bocha web-search API for
//! `search` tasks); tests substitute mocks.

pub mod bocha;
pub mod openai;
pub mod planner;
pub mod search;
pub mod summary;

use anyhow::{bail, Result};
use plan_agent_sdk::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::plan::refs::ResolvedRef;
use crate::plan::types::TaskKind;

pub use bocha::BochaClient;
pub use openai::ChatClient;
pub use planner::OpenAiPlanner;
pub use search::SearchAgent;
pub use summary::SummaryAgent;

/// A task proposed by the planner, before id assignment
#[derive(Debug, Clone, Deserialize)]
pub struct PlannedTask {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub p_node: String,
}

/// The planner's structured reply. `next_check_list` entries may carry
/// `NEW1..NEW3` placeholders for this round's tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerOutput {
    pub is_final: bool,
    pub tasks: Vec<PlannedTask>,
    pub next_check_list: Vec<String>,
    pub note: String,
}

/// Maximum tasks the planner may propose per round
pub const MAX_TASKS_PER_ROUND: usize = 3;

impl PlannerOutput {
    /// Enforce the parts of the contract serde cannot: the batch size cap
    /// and the ban on `start` tasks after bootstrap.
    pub fn validate(&self) -> Result<()> {
        if self.tasks.len() > MAX_TASKS_PER_ROUND {
            bail!(
                "planner proposed {} tasks (max {})",
                self.tasks.len(),
                MAX_TASKS_PER_ROUND
            );
        }
        if self.tasks.iter().any(|t| t.kind == TaskKind::Start) {
            bail!("planner proposed a start task");
        }
        Ok(())
    }
}

/// Context assembled by the orchestrator for one planning step
#[derive(Debug, Clone)]
pub struct PlannerInput {
    /// The user's original question (start node title)
    pub objective: String,
    /// The persisted progress note from the previous round
    pub note: String,
    /// Resolved values for the current check-list refs, in order
    pub inputs: Vec<ResolvedRef>,
}

/// Input to one executor call
#[derive(Debug, Clone)]
pub struct TaskInput {
    pub title: String,
    /// Context resolved from the task's `p_node`; may be empty
    pub context: String,
}

#[async_trait]
pub trait PlannerAgent: Send + Sync {
    async fn plan(&self, input: &PlannerInput) -> Result<PlannerOutput>;
}

#[async_trait]
pub trait ExecutorAgent: Send + Sync {
    fn name(&self) -> &'static str;

    /// Execute a task, returning payload text containing one `<summary>`
    /// block and zero or more `<info type="...">` blocks.
    async fn execute(&self, input: &TaskInput) -> Result<String>;
}

impl std::fmt::Debug for dyn ExecutorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorAgent")
            .field("name", &self.name())
            .finish()
    }
}

/// Dispatch table from task kind to executor. Kinds without a registered
/// executor are rejected before execution begins — no retry.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskKind, Arc<dyn ExecutorAgent>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: TaskKind, agent: Arc<dyn ExecutorAgent>) {
        self.executors.insert(kind, agent);
    }

    pub fn get(&self, kind: TaskKind) -> Result<Arc<dyn ExecutorAgent>> {
        match self.executors.get(&kind) {
            Some(agent) => Ok(agent.clone()),
            None => bail!("unknown task type: {}", kind),
        }
    }
}
