//! End-to-end round loop tests with scripted planners and mock executors

use super::common::*;
use plan_agent::agents::ExecutorRegistry;
use plan_agent::plan::{NodeStatus, TaskKind, FINAL_BATCH};
use plan_agent::workflow::{RoundOrchestrator, StopReason};
use std::sync::Arc;

fn registry_with(
    search: Arc<dyn plan_agent::agents::ExecutorAgent>,
    summary: Arc<dyn plan_agent::agents::ExecutorAgent>,
) -> Arc<ExecutorRegistry> {
    let mut registry = ExecutorRegistry::new();
    registry.register(TaskKind::Search, search);
    registry.register(TaskKind::Summary, summary);
    Arc::new(registry)
}

#[tokio::test]
async fn test_two_round_run_to_final() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "What is the outlook for X?").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![
        output(
            false,
            vec![
                task("Find recent data on X", TaskKind::Search, "a:info"),
                task("Find expert views on X", TaskKind::Search, "a:info"),
            ],
            &["NEW1:summary", "NEW2:summary"],
            "two directions open",
        ),
        output(
            true,
            vec![task(
                "Consolidate findings on X",
                TaskKind::Summary,
                "b:summary, c:summary",
            )],
            &["NEW1:summary"],
            "wrapping up",
        ),
    ]));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo.clone());

    let orchestrator =
        RoundOrchestrator::new(store.clone(), planner.clone(), registry, fast_options(8));
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.stop, StopReason::FinalBatch);
    assert_eq!(summary.rounds, 2);
    assert_eq!(planner.call_count(), 2);

    let doc = store.read().await.unwrap();
    assert_eq!(
        doc.nodes.iter().map(|n| n.node_id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c", "d"]
    );

    // Round 1 nodes: batch 1, completed, echoed payloads split into fields
    let b = doc.find_node("b").unwrap();
    assert_eq!(b.batch, 1);
    assert_eq!(b.status, NodeStatus::Completed);
    assert_eq!(b.summary, "<summary>Find recent data on X conclusion</summary>");
    assert_eq!(b.info, "<info type=\"llm\">Find recent data on X analysis</info>");
    assert!(b.updated_at.is_some());

    // Final round node carries the sentinel batch
    let d = doc.find_node("d").unwrap();
    assert_eq!(d.batch, FINAL_BATCH);
    assert_eq!(d.p_node, "b:summary, c:summary");
    assert_eq!(d.status, NodeStatus::Completed);

    // Check list advanced through both rounds
    assert_eq!(doc.check_list.latest_id, "d");
    assert_eq!(doc.check_list.latest_batch, FINAL_BATCH);
    assert_eq!(doc.check_list.refs, vec!["d:summary"]);
    assert_eq!(doc.check_list.note, "wrapping up");

    // Round 1 planning saw the bootstrapped start-node ref, resolved through
    // the fallback chain down to the title
    let seen = planner.seen.lock().unwrap();
    assert_eq!(seen[0].inputs.len(), 1);
    assert_eq!(seen[0].inputs[0].expr, "a:info");
    assert_eq!(seen[0].inputs[0].value, "What is the outlook for X?");
    assert_eq!(seen[0].objective, "What is the outlook for X?");

    // Round 2 planning saw round 1's completed summaries
    assert_eq!(seen[1].inputs.len(), 2);
    assert!(seen[1].inputs[0].value.contains("Find recent data on X conclusion"));
    assert_eq!(seen[1].note, "two directions open");

    // Executors got context resolved from their p_node
    let inputs = echo.seen.lock().unwrap();
    assert!(inputs
        .iter()
        .any(|i| i.context == "# a:info\nWhat is the outlook for X?"));
}

#[tokio::test]
async fn test_results_land_on_their_own_nodes_regardless_of_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    // EchoExecutor sleeps less for later submissions, so completion order is
    // reversed relative to task order
    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        vec![
            task("alpha", TaskKind::Search, "a:info"),
            task("beta", TaskKind::Search, "a:info"),
            task("gamma", TaskKind::Search, "a:info"),
        ],
        &[],
        "",
    )]));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo);

    let orchestrator = RoundOrchestrator::new(store.clone(), planner, registry, fast_options(1));
    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.stop, StopReason::MaxRounds);

    let doc = store.read().await.unwrap();
    for (id, title) in [("b", "alpha"), ("c", "beta"), ("d", "gamma")] {
        let node = doc.find_node(id).unwrap();
        assert_eq!(node.title, title);
        assert_eq!(
            node.summary,
            format!("<summary>{} conclusion</summary>", title)
        );
    }
}

#[tokio::test]
async fn test_placeholder_without_matching_task_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        vec![task("only one", TaskKind::Search, "a:info")],
        &["NEW1:summary", "NEW2:summary", "a:summary"],
        "",
    )]));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo);

    let orchestrator = RoundOrchestrator::new(store.clone(), planner, registry, fast_options(1));
    orchestrator.run().await.unwrap();

    let doc = store.read().await.unwrap();
    assert_eq!(doc.check_list.refs, vec!["b:summary", "a:summary"]);
}

#[tokio::test]
async fn test_empty_batch_stops_but_still_updates_check_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        Vec::new(),
        &["a:summary"],
        "nothing left to do",
    )]));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo);

    let orchestrator =
        RoundOrchestrator::new(store.clone(), planner.clone(), registry, fast_options(8));
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.stop, StopReason::EmptyBatch);
    assert_eq!(summary.rounds, 1);
    assert_eq!(planner.call_count(), 1);

    let doc = store.read().await.unwrap();
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.check_list.latest_id, "a");
    assert_eq!(doc.check_list.latest_batch, 0);
    assert_eq!(doc.check_list.refs, vec!["a:summary"]);
    assert_eq!(doc.check_list.note, "nothing left to do");
}

#[tokio::test]
async fn test_final_plan_is_not_replanned() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;
    let mut doc = store.read().await.unwrap();
    doc.check_list.latest_batch = FINAL_BATCH;
    store.write(&doc).await.unwrap();

    let planner = Arc::new(ScriptedPlanner::new(Vec::new()));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo);

    let orchestrator =
        RoundOrchestrator::new(store.clone(), planner.clone(), registry, fast_options(8));
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.stop, StopReason::FinalBatch);
    assert_eq!(planner.call_count(), 0);
}

#[tokio::test]
async fn test_transient_executor_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        vec![task("flaky task", TaskKind::Search, "a:info")],
        &[],
        "",
    )]));
    let flaky = Arc::new(FlakyExecutor::new(2));
    let registry = registry_with(flaky.clone(), flaky.clone());

    let orchestrator = RoundOrchestrator::new(store.clone(), planner, registry, fast_options(1));
    orchestrator.run().await.unwrap();

    assert_eq!(flaky.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    let doc = store.read().await.unwrap();
    assert_eq!(doc.find_node("b").unwrap().status, NodeStatus::Completed);
}

#[tokio::test]
async fn test_fatal_failure_aborts_without_persisting_the_round() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        vec![task("doomed", TaskKind::Search, "a:info")],
        &["NEW1:summary"],
        "should never land",
    )]));
    let failing = Arc::new(FailingExecutor);
    let registry = registry_with(failing.clone(), failing);

    let orchestrator = RoundOrchestrator::new(store.clone(), planner, registry, fast_options(8));
    let err = orchestrator.run().await.unwrap_err();
    assert!(format!("{:#}", err).contains("round 1 aborted"));

    // Only the bootstrap ref write landed; the planned node did not
    let doc = store.read().await.unwrap();
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.check_list.latest_id, "a");
    assert_eq!(doc.check_list.latest_batch, 0);
    assert_eq!(doc.check_list.refs, vec!["a:info"]);
    assert_ne!(doc.check_list.note, "should never land");
}

#[tokio::test]
async fn test_unregistered_task_kind_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        vec![task("needs summary", TaskKind::Summary, "a:info")],
        &[],
        "",
    )]));
    // Only search is registered
    let mut registry = ExecutorRegistry::new();
    registry.register(TaskKind::Search, Arc::new(EchoExecutor::new()));

    let orchestrator =
        RoundOrchestrator::new(store, planner, Arc::new(registry), fast_options(8));
    let err = orchestrator.run().await.unwrap_err();
    assert!(format!("{:#}", err).contains("unknown task type: summary"));
}

#[tokio::test]
async fn test_oversized_batch_is_a_contract_violation() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    let planner = Arc::new(ScriptedPlanner::new(vec![output(
        false,
        vec![
            task("1", TaskKind::Search, ""),
            task("2", TaskKind::Search, ""),
            task("3", TaskKind::Search, ""),
            task("4", TaskKind::Search, ""),
        ],
        &[],
        "",
    )]));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo);

    let orchestrator = RoundOrchestrator::new(store.clone(), planner, registry, fast_options(8));
    let err = orchestrator.run().await.unwrap_err();
    assert!(format!("{:#}", err).contains("planner contract violation"));

    let doc = store.read().await.unwrap();
    assert_eq!(doc.nodes.len(), 1);
}

#[tokio::test]
async fn test_round_budget_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir, "q").await;

    // Every round plans one more search task, never final
    let rounds: Vec<_> = (0..5)
        .map(|i| {
            output(
                false,
                vec![task(&format!("step {}", i), TaskKind::Search, "a:info")],
                &["NEW1:summary"],
                "",
            )
        })
        .collect();
    let planner = Arc::new(ScriptedPlanner::new(rounds));
    let echo = Arc::new(EchoExecutor::new());
    let registry = registry_with(echo.clone(), echo);

    let orchestrator =
        RoundOrchestrator::new(store.clone(), planner.clone(), registry, fast_options(2));
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.stop, StopReason::MaxRounds);
    assert_eq!(summary.rounds, 2);
    assert_eq!(planner.call_count(), 2);

    let doc = store.read().await.unwrap();
    // Start node plus one node per completed round
    assert_eq!(doc.nodes.len(), 3);
    assert_eq!(doc.check_list.latest_id, "c");
    assert_eq!(doc.check_list.latest_batch, 2);
}
