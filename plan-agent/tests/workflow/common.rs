//! Shared mocks and helpers for workflow integration tests

use anyhow::{anyhow, Result};
use plan_agent::agents::{
    ExecutorAgent, PlannedTask, PlannerAgent, PlannerInput, PlannerOutput, TaskInput,
};
use plan_agent::plan::{PlanDocument, PlanStore, TaskKind};
use plan_agent::workflow::{RetryPolicy, RunOptions};
use plan_agent_sdk::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn task(title: &str, kind: TaskKind, p_node: &str) -> PlannedTask {
    PlannedTask {
        title: title.to_string(),
        kind,
        p_node: p_node.to_string(),
    }
}

pub fn output(
    is_final: bool,
    tasks: Vec<PlannedTask>,
    next_check_list: &[&str],
    note: &str,
) -> PlannerOutput {
    PlannerOutput {
        is_final,
        tasks,
        next_check_list: next_check_list.iter().map(|s| s.to_string()).collect(),
        note: note.to_string(),
    }
}

/// Run options with a millisecond-scale retry backoff
pub fn fast_options(max_rounds: usize) -> RunOptions {
    RunOptions {
        max_rounds,
        concurrency: 3,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
    }
}

pub async fn seeded_store(dir: &tempfile::TempDir, query: &str) -> PlanStore {
    let store = PlanStore::new(dir.path().join("plan.json"));
    store
        .write(&PlanDocument::new_from_query(query))
        .await
        .unwrap();
    store
}

/// Planner that replays a fixed script, one output per round, recording the
/// inputs it was given. When the script runs out it plans nothing.
pub struct ScriptedPlanner {
    steps: Mutex<Vec<PlannerOutput>>,
    pub seen: Mutex<Vec<PlannerInput>>,
    pub calls: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn new(steps: Vec<PlannerOutput>) -> Self {
        ScriptedPlanner {
            steps: Mutex::new(steps),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlannerAgent for ScriptedPlanner {
    async fn plan(&self, input: &PlannerInput) -> Result<PlannerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(input.clone());
        let mut steps = self.steps.lock().unwrap();
        if steps.is_empty() {
            Ok(output(false, Vec::new(), &[], "script exhausted"))
        } else {
            Ok(steps.remove(0))
        }
    }
}

/// Executor that answers from the task title, recording every input. Calls
/// sleep progressively shorter so later submissions finish first.
pub struct EchoExecutor {
    pub seen: Mutex<Vec<TaskInput>>,
    calls: AtomicUsize,
}

impl EchoExecutor {
    pub fn new() -> Self {
        EchoExecutor {
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn payload_for(title: &str) -> String {
        format!(
            "<info type=\"llm\">{} analysis</info>\n<summary>{} conclusion</summary>",
            title, title
        )
    }
}

#[async_trait]
impl ExecutorAgent for EchoExecutor {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn execute(&self, input: &TaskInput) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(n as u64 * 10))).await;
        self.seen.lock().unwrap().push(input.clone());
        Ok(Self::payload_for(&input.title))
    }
}

/// Executor that fails with a transient error for the first `fail_first`
/// calls, then succeeds.
pub struct FlakyExecutor {
    fail_first: usize,
    pub calls: AtomicUsize,
}

impl FlakyExecutor {
    pub fn new(fail_first: usize) -> Self {
        FlakyExecutor {
            fail_first,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ExecutorAgent for FlakyExecutor {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn execute(&self, input: &TaskInput) -> Result<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
            Err(anyhow!("HTTP 429: rate limit exceeded"))
        } else {
            Ok(EchoExecutor::payload_for(&input.title))
        }
    }
}

/// Executor that always fails with a non-retriable error
pub struct FailingExecutor;

#[async_trait]
impl ExecutorAgent for FailingExecutor {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn execute(&self, _input: &TaskInput) -> Result<String> {
        Err(anyhow!("invalid request payload"))
    }
}
