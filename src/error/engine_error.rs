//! Run-time engine errors.

use thiserror::Error;

use crate::state::NodeStatus;

/// Errors surfaced by the dispatcher and the persistence boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Node not found: run={run_id}, node={node_id}")]
    NodeNotFound { run_id: String, node_id: String },
    #[error("Invalid status transition for node {node_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        node_id: String,
        from: NodeStatus,
        to: NodeStatus,
    },
    #[error("Graph node not found: {0}")]
    GraphNodeNotFound(String),
    #[error("Store error: {0}")]
    Store(String),
}
