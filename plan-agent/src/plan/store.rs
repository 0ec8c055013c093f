//! Persistence for the plan document
//!
//! The store does full-document reads and writes of pretty-printed JSON.
//! There is exactly one writer at a time (the orchestrator); concurrent
//! writers pointed at the same file are unsupported.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::plan::types::{NodeResult, PlanDocument};

/// On-disk plan document store
#[derive(Debug, Clone)]
pub struct PlanStore {
    path: PathBuf,
}

impl PlanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PlanStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<PlanDocument> {
        let raw = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read plan file: {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid plan document: {}", self.path.display()))
    }

    /// Full replace of the persisted document
    pub async fn write(&self, doc: &PlanDocument) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await.with_context(|| {
                    format!("failed to create plan directory: {}", dir.display())
                })?;
            }
        }
        let text = serde_json::to_string_pretty(doc).context("failed to serialize plan")?;
        fs::write(&self.path, text)
            .await
            .with_context(|| format!("failed to write plan file: {}", self.path.display()))
    }

    /// Read-modify-write of a single node's result. The round loop merges in
    /// memory and persists once instead; this is for out-of-band updates.
    pub async fn upsert_node_result(&self, node_id: &str, result: &NodeResult) -> Result<()> {
        let mut doc = self.read().await?;
        doc.apply_result(node_id, result)?;
        self.write(&doc).await
    }
}
