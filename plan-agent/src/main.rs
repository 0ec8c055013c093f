use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use plan_agent::agents::{
    BochaClient, ChatClient, ExecutorRegistry, OpenAiPlanner, SearchAgent, SummaryAgent,
};
use plan_agent::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use plan_agent::plan::{PlanDocument, PlanStore, TaskKind};
use plan_agent::workflow::{RetryPolicy, RoundOrchestrator, RunOptions, StopReason};

#[derive(Parser, Debug)]
#[command(
    name = "plan-agent",
    about = "Iterative research workflow over a persisted plan document",
    version
)]
struct Args {
    /// Research question to start a new plan from
    #[arg(long, conflicts_with = "plan")]
    query: Option<String>,

    /// Existing plan file to resume
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Output path for a new plan (default: runs/plan_<timestamp>.json)
    #[arg(long, requires = "query")]
    out: Option<PathBuf>,

    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Round budget (overrides config)
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Concurrent task limit (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let config = AgentConfig::load(&args.config)?;

    let store = match (&args.plan, &args.query) {
        (Some(path), _) => {
            if !path.exists() {
                bail!("plan file not found: {}", path.display());
            }
            println!("[workflow] resuming plan at {}", path.display());
            PlanStore::new(path.clone())
        }
        (None, Some(query)) => {
            let out = args.out.clone().unwrap_or_else(default_plan_path);
            let store = PlanStore::new(out);
            store.write(&PlanDocument::new_from_query(query)).await?;
            println!("[workflow] new plan at {}", store.path().display());
            store
        }
        (None, None) => bail!("either --plan or --query is required"),
    };

    let chat = Arc::new(ChatClient::new(&config.openai)?);
    let bocha = Arc::new(BochaClient::new(&config.bocha)?);
    let planner = Arc::new(OpenAiPlanner::new(chat.clone()));

    let mut registry = ExecutorRegistry::new();
    registry.register(
        TaskKind::Search,
        Arc::new(SearchAgent::new(chat.clone(), bocha)),
    );
    registry.register(TaskKind::Summary, Arc::new(SummaryAgent::new(chat)));

    let options = RunOptions {
        max_rounds: args.max_rounds.unwrap_or(config.workflow.max_rounds),
        concurrency: args
            .concurrency
            .unwrap_or(config.workflow.concurrency)
            .max(1),
        retry: RetryPolicy::default(),
    };

    let orchestrator = RoundOrchestrator::new(store, planner, Arc::new(registry), options);
    let summary = orchestrator.run().await?;

    match summary.stop {
        StopReason::FinalBatch => println!(
            "[workflow] done: plan is final after {} round(s)",
            summary.rounds
        ),
        StopReason::EmptyBatch => println!(
            "[workflow] done: planner proposed no further tasks (round {})",
            summary.rounds
        ),
        StopReason::MaxRounds => println!(
            "[workflow] done: round budget of {} exhausted",
            summary.rounds
        ),
    }
    Ok(())
}

fn default_plan_path() -> PathBuf {
    PathBuf::from(format!(
        "runs/plan_{}.json",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
    ))
}
