//! Shared support for plan-agent workflows: structured event logging and
//! the async trait re-export used by agent implementations.
//!
//! Events are emitted as one JSON line per event on stderr so that wrapping
//! processes (or a future UI) can follow workflow progress without scraping
//! human-readable output.

use serde::{Deserialize, Serialize};

// Re-export async trait for agent implementors
pub use async_trait::async_trait;

/// Structured workflow events emitted during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A planning/execution round started
    RoundStarted {
        round: usize,
        max_rounds: usize,
    },
    /// A round finished (all tasks written back)
    RoundCompleted {
        round: usize,
        tasks: usize,
    },
    /// A round was aborted by a fatal error
    RoundFailed {
        round: usize,
        error: String,
    },
    /// A task in the current round started executing
    TaskStarted {
        round: usize,
        task_id: String,
        description: String,
        total_tasks: usize,
    },
    /// A task produced its result
    TaskCompleted {
        task_id: String,
        result: Option<String>,
    },
    /// A task failed after exhausting its retry budget (or non-retriably)
    TaskFailed {
        task_id: String,
        error: String,
    },
    /// A transient task failure is being retried after a backoff delay
    TaskRetrying {
        attempt: usize,
        delay_ms: u64,
        error: String,
    },
    /// An external agent call started
    AgentStarted {
        task_id: String,
        agent_name: String,
    },
    /// An external agent call completed
    AgentCompleted {
        task_id: String,
        agent_name: String,
    },
    /// An external agent call failed
    AgentFailed {
        task_id: String,
        agent_name: String,
        error: String,
    },
    /// The plan document was persisted
    PlanSaved {
        path: String,
        nodes: usize,
    },
}

impl WorkflowEvent {
    /// Emit this event to stderr as a single machine-readable line
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("__WF_EVENT__:{}", json);
            // Force flush stderr in async/concurrent contexts
            let _ = std::io::stderr().flush();
        }
    }
}

/// Helper macros for workflow event logging
#[macro_export]
macro_rules! log_round_start {
    ($round:expr, $max:expr) => {
        $crate::WorkflowEvent::RoundStarted {
            round: $round,
            max_rounds: $max,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_round_complete {
    ($round:expr, $tasks:expr) => {
        $crate::WorkflowEvent::RoundCompleted {
            round: $round,
            tasks: $tasks,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_round_failed {
    ($round:expr, $error:expr) => {
        $crate::WorkflowEvent::RoundFailed {
            round: $round,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_start {
    ($round:expr, $task_id:expr, $desc:expr, $total:expr) => {
        $crate::WorkflowEvent::TaskStarted {
            round: $round,
            task_id: $task_id.to_string(),
            description: $desc.to_string(),
            total_tasks: $total,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_complete {
    ($task_id:expr) => {
        $crate::WorkflowEvent::TaskCompleted {
            task_id: $task_id.to_string(),
            result: None,
        }
        .emit();
    };
    ($task_id:expr, $result:expr) => {
        $crate::WorkflowEvent::TaskCompleted {
            task_id: $task_id.to_string(),
            result: Some($result.to_string()),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_failed {
    ($task_id:expr, $error:expr) => {
        $crate::WorkflowEvent::TaskFailed {
            task_id: $task_id.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_retry {
    ($attempt:expr, $delay_ms:expr, $error:expr) => {
        $crate::WorkflowEvent::TaskRetrying {
            attempt: $attempt,
            delay_ms: $delay_ms,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_start {
    ($task_id:expr, $agent:expr) => {
        $crate::WorkflowEvent::AgentStarted {
            task_id: $task_id.to_string(),
            agent_name: $agent.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_complete {
    ($task_id:expr, $agent:expr) => {
        $crate::WorkflowEvent::AgentCompleted {
            task_id: $task_id.to_string(),
            agent_name: $agent.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_failed {
    ($task_id:expr, $agent:expr, $error:expr) => {
        $crate::WorkflowEvent::AgentFailed {
            task_id: $task_id.to_string(),
            agent_name: $agent.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_plan_saved {
    ($path:expr, $nodes:expr) => {
        $crate::WorkflowEvent::PlanSaved {
            path: $path.to_string(),
            nodes: $nodes,
        }
        .emit();
    };
}
