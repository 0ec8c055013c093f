//! Round loop machinery: retry, bounded batches, and the orchestrator.

pub mod batch;
pub mod orchestrator;
pub mod retry;

pub use batch::execute_batch;
pub use orchestrator::{RoundOrchestrator, RunOptions, RunSummary, StopReason};
pub use retry::{is_transient, with_retry, RetryPolicy};
