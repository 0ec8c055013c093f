//! Round orchestration: the planning/execution/write-back state machine
//!
//! One round is Planning → id assignment and node creation → placeholder
//! resolution → Executing → WritingBack → Checking. Rounds are strictly
//! sequential; within a round, execution is concurrent up to the configured
//! bound. The document is mutated in memory for the round's duration and
//! persisted once at round end (plus the idempotent bootstrap write), so a
//! fatal error during execution leaves the persisted plan at its pre-round
//! state. Any fatal error aborts the round and surfaces to the caller; there
//! is no partial-success commit.

use anyhow::{Context, Result};
use plan_agent_sdk::{
    log_agent_complete, log_agent_failed, log_agent_start, log_plan_saved, log_round_complete,
    log_round_failed, log_round_start, log_task_complete, log_task_failed, log_task_start,
};
use std::sync::Arc;

use crate::agents::{ExecutorRegistry, PlannerAgent, PlannerInput, TaskInput};
use crate::plan::blocks::parse_payload;
use crate::plan::ids::next_id;
use crate::plan::refs::{build_context, resolve_placeholders, resolve_refs, sanitize_p_node};
use crate::plan::store::PlanStore;
use crate::plan::types::{NodeResult, NodeStatus, PlanDocument, PlanNode, TaskKind, FINAL_BATCH};
use crate::workflow::batch::execute_batch;
use crate::workflow::retry::{with_retry, RetryPolicy};

/// Operational controls for a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_rounds: usize,
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_rounds: 8,
            concurrency: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why the round loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The check list reached the final-batch sentinel
    FinalBatch,
    /// The planner proposed no tasks
    EmptyBatch,
    /// The configured round budget ran out
    MaxRounds,
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Rounds entered before stopping
    pub rounds: usize,
    pub stop: StopReason,
}

enum RoundOutcome {
    Continue { tasks: usize },
    Stop(StopReason),
}

/// One task of the current round, after id assignment
#[derive(Debug, Clone)]
struct RoundTask {
    node_id: String,
    title: String,
    kind: TaskKind,
    p_node: String,
}

pub struct RoundOrchestrator {
    store: PlanStore,
    planner: Arc<dyn PlannerAgent>,
    executors: Arc<ExecutorRegistry>,
    options: RunOptions,
}

impl RoundOrchestrator {
    pub fn new(
        store: PlanStore,
        planner: Arc<dyn PlannerAgent>,
        executors: Arc<ExecutorRegistry>,
        options: RunOptions,
    ) -> Self {
        RoundOrchestrator {
            store,
            planner,
            executors,
            options,
        }
    }

    /// Run rounds until the plan is final, the planner runs dry, or the
    /// round budget is exhausted.
    pub async fn run(&self) -> Result<RunSummary> {
        for round in 1..=self.options.max_rounds {
            log_round_start!(round, self.options.max_rounds);
            println!(
                "[workflow] === Round {} planning (concurrency={}) ===",
                round, self.options.concurrency
            );
            match self.run_round(round).await {
                Ok(RoundOutcome::Continue { tasks }) => {
                    log_round_complete!(round, tasks);
                }
                Ok(RoundOutcome::Stop(reason)) => {
                    return Ok(RunSummary {
                        rounds: round,
                        stop: reason,
                    });
                }
                Err(err) => {
                    log_round_failed!(round, format!("{:#}", err));
                    return Err(err.context(format!("round {} aborted", round)));
                }
            }
        }
        println!("[workflow] reached max rounds; stop.");
        Ok(RunSummary {
            rounds: self.options.max_rounds,
            stop: StopReason::MaxRounds,
        })
    }

    async fn run_round(&self, round: usize) -> Result<RoundOutcome> {
        let mut doc = self.store.read().await?;
        if doc.is_final() {
            println!("[workflow] plan already at final batch; stop.");
            return Ok(RoundOutcome::Stop(StopReason::FinalBatch));
        }

        self.bootstrap_refs(&mut doc).await?;

        // Planning
        let inputs = resolve_refs(&doc, &doc.check_list.refs);
        let objective = doc
            .start_node()
            .map(|n| n.title.clone())
            .unwrap_or_default();
        let planner_input = PlannerInput {
            objective,
            note: doc.check_list.note.clone(),
            inputs,
        };
        let output = self
            .planner
            .plan(&planner_input)
            .await
            .context("planning step failed")?;
        output.validate().context("planner contract violation")?;

        // Id assignment and node creation
        let batch = if output.is_final {
            FINAL_BATCH
        } else {
            doc.check_list.latest_batch + 1
        };
        let mut cur_id = doc.check_list.latest_id.clone();
        let mut assigned_ids = Vec::new();
        let mut tasks = Vec::new();
        for planned in &output.tasks {
            cur_id = next_id(&cur_id);
            let p_node = sanitize_p_node(&planned.p_node);
            doc.nodes.push(PlanNode {
                node_id: cur_id.clone(),
                title: planned.title.clone(),
                summary: String::new(),
                info: String::new(),
                p_node: p_node.clone(),
                batch,
                kind: planned.kind,
                status: NodeStatus::Planned,
                updated_at: None,
            });
            assigned_ids.push(cur_id.clone());
            tasks.push(RoundTask {
                node_id: cur_id.clone(),
                title: planned.title.clone(),
                kind: planned.kind,
                p_node,
            });
        }

        // Placeholder resolution and check-list advance
        doc.check_list.refs = resolve_placeholders(&output.next_check_list, &assigned_ids);
        if let Some(last) = assigned_ids.last() {
            doc.check_list.latest_id = last.clone();
            doc.check_list.latest_batch = batch;
        }
        doc.check_list.note = output.note.clone();

        if tasks.is_empty() {
            // Zero new nodes; the check-list update still lands
            self.persist(&doc).await?;
            println!("[workflow] no tasks planned; stop.");
            return Ok(RoundOutcome::Stop(StopReason::EmptyBatch));
        }

        // Executing: every task resolves context against the same snapshot,
        // so siblings never see each other's intermediate results
        let snapshot = Arc::new(doc.clone());
        let registry = self.executors.clone();
        let policy = self.options.retry.clone();
        let total = tasks.len();
        let task_list = tasks.clone();
        let results = execute_batch(tasks, self.options.concurrency, move |_idx, task| {
            let snapshot = snapshot.clone();
            let registry = registry.clone();
            let policy = policy.clone();
            async move { execute_round_task(round, total, task, snapshot, registry, policy).await }
        })
        .await?;

        // WritingBack: apply in task order, persist once
        for (task, result) in task_list.iter().zip(results.iter()) {
            doc.apply_result(&task.node_id, result)
                .with_context(|| format!("write-back failed for node {}", task.node_id))?;
        }
        self.persist(&doc).await?;

        // Checking
        let checked = self.store.read().await?;
        if checked.is_final() {
            println!("[workflow] reached final batch ({}); stop.", FINAL_BATCH);
            return Ok(RoundOutcome::Stop(StopReason::FinalBatch));
        }
        Ok(RoundOutcome::Continue {
            tasks: task_list.len(),
        })
    }

    /// Seed the check list with the start node's info on a fresh document,
    /// so the first planning step sees the user's initial context. Persisted
    /// immediately for transparency; idempotent.
    async fn bootstrap_refs(&self, doc: &mut PlanDocument) -> Result<()> {
        if !doc.check_list.refs.is_empty() || doc.nodes.len() != 1 {
            return Ok(());
        }
        if doc.nodes[0].kind != TaskKind::Start {
            return Ok(());
        }
        let nid = doc.nodes[0].node_id.to_ascii_lowercase();
        doc.check_list.refs = vec![format!("{}:info", nid)];
        self.store.write(doc).await?;
        eprintln!("[planning] bootstrap refs -> [\"{}:info\"]", nid);
        Ok(())
    }

    async fn persist(&self, doc: &PlanDocument) -> Result<()> {
        self.store.write(doc).await?;
        log_plan_saved!(self.store.path().display(), doc.nodes.len());
        Ok(())
    }
}

async fn execute_round_task(
    round: usize,
    total: usize,
    task: RoundTask,
    snapshot: Arc<PlanDocument>,
    registry: Arc<ExecutorRegistry>,
    policy: RetryPolicy,
) -> Result<NodeResult> {
    log_task_start!(round, &task.node_id, &task.title, total);
    println!(
        "[workflow] executing {} ({}) :: {}",
        task.node_id, task.kind, task.title
    );

    // Unknown kinds fail here, before any retry machinery engages
    let executor = registry.get(task.kind)?;
    let input = TaskInput {
        title: task.title.clone(),
        context: build_context(&snapshot, &task.p_node),
    };

    log_agent_start!(&task.node_id, executor.name());
    let payload = {
        let executor = executor.clone();
        with_retry(&policy, move || {
            let executor = executor.clone();
            let input = input.clone();
            async move { executor.execute(&input).await }
        })
        .await
    };
    let payload = match payload {
        Ok(payload) => payload,
        Err(err) => {
            log_agent_failed!(&task.node_id, executor.name(), format!("{:#}", err));
            log_task_failed!(&task.node_id, format!("{:#}", err));
            return Err(err.context(format!("task {} ({}) failed", task.node_id, task.kind)));
        }
    };
    log_agent_complete!(&task.node_id, executor.name());

    let parsed = parse_payload(&payload);
    let summary = parsed
        .summary
        .unwrap_or_else(|| "<summary>(no summary)</summary>".to_string());
    let info = parsed
        .info_blocks
        .iter()
        .map(|b| b.xml.clone())
        .collect::<Vec<_>>()
        .join("\n\n");

    log_task_complete!(&task.node_id);
    println!("[workflow] completed {}", task.node_id);
    Ok(NodeResult { summary, info })
}
