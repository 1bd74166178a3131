//! Persistence collaborator.
//!
//! The engine never mutates a [`Run`] except through
//! [`RunStore::update_node_states`], which must apply every entry in one
//! atomic step: two sibling paths completing back-to-back may not clobber
//! each other, because the collector's all-complete check reads a snapshot
//! that must reflect every prior sibling write.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{EngineError, EngineResult};
use crate::graph::ExecutionGraph;

use super::run::{NodeState, Run};

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create a run with every execution node `pending`.
    async fn create_run(&self, graph: &ExecutionGraph) -> EngineResult<Run>;

    async fn get_run(&self, run_id: &str) -> EngineResult<Run>;

    /// Atomically apply a multi-key update and return the post-update
    /// snapshot. All-or-nothing; concurrent callers serialize per run.
    async fn update_node_states(
        &self,
        run_id: &str,
        updates: HashMap<String, NodeState>,
    ) -> EngineResult<Run>;

    async fn delete_run(&self, run_id: &str) -> EngineResult<()>;
}

/// In-memory store. The per-run entry lock makes `update_node_states`
/// atomic with respect to concurrent sibling callbacks.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: DashMap<String, Run>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create_run(&self, graph: &ExecutionGraph) -> EngineResult<Run> {
        let run = Run::new(graph);
        self.runs.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn get_run(&self, run_id: &str) -> EngineResult<Run> {
        self.runs
            .get(run_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    async fn update_node_states(
        &self,
        run_id: &str,
        updates: HashMap<String, NodeState>,
    ) -> EngineResult<Run> {
        let mut entry = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        for (entry_id, state) in updates {
            entry.node_states.insert(entry_id, state);
        }
        Ok(entry.clone())
    }

    async fn delete_run(&self, run_id: &str) -> EngineResult<()> {
        self.runs
            .remove(run_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }
}
