//! Bounded-concurrency execution over an ordered task list
//!
//! Tasks run at most `concurrency` at a time; each future carries its input
//! index so results come back in submission order no matter how completions
//! interleave. Fails fast: the first task error aborts collection and
//! propagates.

use anyhow::{anyhow, Result};
use futures::{stream::FuturesUnordered, Future, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub async fn execute_batch<T, F, Fut, R>(
    items: Vec<T>,
    concurrency: usize,
    task_executor: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let executor = Arc::new(task_executor);
    let mut tasks = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let executor = executor.clone();
        tasks.push(async move {
            let _permit = sem
                .acquire()
                .await
                .map_err(|_| anyhow!("Semaphore closed"))?;
            let result = executor(idx, item).await?;
            Ok::<_, anyhow::Error>((idx, result))
        });
    }

    // Collect as completions arrive, slotting by input index
    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    while let Some(result) = tasks.next().await {
        let (idx, value) = result?;
        slots[idx] = Some(value);
    }

    let mut results = Vec::with_capacity(total);
    for (idx, slot) in slots.into_iter().enumerate() {
        results.push(slot.ok_or_else(|| anyhow!("task {} produced no result", idx))?);
    }
    Ok(results)
}
