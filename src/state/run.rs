//! Run records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::ExecutionGraph;

use super::status::NodeStatus;

/// State of one node entry: base node id, or an augmented id
/// `"{base}_{index}"` for splitter-created paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeState {
    pub fn pending() -> Self {
        NodeState {
            status: NodeStatus::Pending,
            output: None,
            error: None,
        }
    }

    pub fn running() -> Self {
        NodeState {
            status: NodeStatus::Running,
            output: None,
            error: None,
        }
    }

    pub fn completed(output: Option<Value>) -> Self {
        NodeState {
            status: NodeStatus::Completed,
            output,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        NodeState {
            status: NodeStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn waiting(output: Option<Value>) -> Self {
        NodeState {
            status: NodeStatus::WaitingForUser,
            output,
            error: None,
        }
    }
}

/// One execution instance of a compiled graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub graph_id: String,
    pub created_at: DateTime<Utc>,
    pub node_states: HashMap<String, NodeState>,
}

impl Run {
    /// Fresh run with every execution node `pending`.
    pub fn new(graph: &ExecutionGraph) -> Self {
        let node_states = graph
            .nodes
            .keys()
            .map(|id| (id.clone(), NodeState::pending()))
            .collect();
        Run {
            id: uuid::Uuid::new_v4().to_string(),
            graph_id: graph.id.clone(),
            created_at: Utc::now(),
            node_states,
        }
    }

    pub fn state(&self, entry_id: &str) -> Option<&NodeState> {
        self.node_states.get(entry_id)
    }

    pub fn status_of(&self, entry_id: &str) -> Option<NodeStatus> {
        self.node_states.get(entry_id).map(|s| s.status)
    }

    /// Per-status entry counts.
    pub fn status_summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for state in self.node_states.values() {
            match state.status {
                NodeStatus::Pending => summary.pending += 1,
                NodeStatus::Running => summary.running += 1,
                NodeStatus::Completed => summary.completed += 1,
                NodeStatus::Failed => summary.failed += 1,
                NodeStatus::WaitingForUser => summary.waiting_for_user += 1,
            }
        }
        summary
    }

    /// True when no entry is mid-flight (`running` or `waiting_for_user`).
    /// Pending entries downstream of a failure stay pending; they do not
    /// count as in-flight.
    pub fn is_settled(&self) -> bool {
        !self.node_states.values().any(|s| {
            matches!(
                s.status,
                NodeStatus::Running | NodeStatus::WaitingForUser
            )
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub waiting_for_user: usize,
}
