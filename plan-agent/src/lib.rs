//! Iterative research workflow over a persisted plan document.
//!
//! A planner proposes up to three tasks per round; executors run them with
//! bounded concurrency; results merge back into an append-only node graph;
//! the check list carried between rounds decides what the next planning step
//! sees. Rounds repeat until the planner marks the plan final, proposes
//! nothing, or the round budget runs out.

pub mod agents;
pub mod config;
pub mod plan;
pub mod workflow;
