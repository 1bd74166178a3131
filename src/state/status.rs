//! Node status state machine.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Status of one node entry within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    WaitingForUser,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
            NodeStatus::WaitingForUser => "waiting_for_user",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure transition guard.
///
/// Same-to-same is always valid so re-delivered callbacks are no-ops.
/// `failed -> pending` exists for manual retry. A node never jumps from
/// `pending` straight to a terminal status; it passes through `running` or
/// `waiting_for_user` first.
pub fn is_valid_transition(from: NodeStatus, to: NodeStatus) -> bool {
    use NodeStatus::*;
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (Pending, Running)
            | (Pending, WaitingForUser)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, WaitingForUser)
            | (WaitingForUser, Completed)
            | (Failed, Pending)
    )
}

/// Throwing variant of [`is_valid_transition`], used by every write path
/// before persistence. Violations are reported, never clamped.
pub fn ensure_valid_transition(
    node_id: &str,
    from: NodeStatus,
    to: NodeStatus,
) -> Result<(), EngineError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition {
            node_id: node_id.to_string(),
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::NodeStatus::*;
    use super::*;

    const ALL: [NodeStatus; 5] = [Pending, Running, Completed, Failed, WaitingForUser];

    #[test]
    fn test_same_to_same_always_valid() {
        for status in ALL {
            assert!(is_valid_transition(status, status));
        }
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(is_valid_transition(Pending, Running));
        assert!(is_valid_transition(Pending, WaitingForUser));
        assert!(is_valid_transition(Running, Completed));
        assert!(is_valid_transition(Running, Failed));
        assert!(is_valid_transition(Running, WaitingForUser));
        assert!(is_valid_transition(WaitingForUser, Completed));
        assert!(is_valid_transition(Failed, Pending));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!is_valid_transition(Pending, Completed));
        assert!(!is_valid_transition(Pending, Failed));
        assert!(!is_valid_transition(WaitingForUser, Running));
        assert!(!is_valid_transition(WaitingForUser, Failed));
        assert!(!is_valid_transition(Completed, Running));
        assert!(!is_valid_transition(Completed, Pending));
        assert!(!is_valid_transition(Failed, Running));
        assert!(!is_valid_transition(Failed, Completed));
        assert!(!is_valid_transition(Running, Pending));
    }

    #[test]
    fn test_ensure_reports_offender() {
        let err = ensure_valid_transition("gate", WaitingForUser, Failed).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gate"));
        assert!(msg.contains("WaitingForUser"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&WaitingForUser).unwrap();
        assert_eq!(json, "\"waiting_for_user\"");
        let back: NodeStatus = serde_json::from_str("\"waiting_for_user\"").unwrap();
        assert_eq!(back, WaitingForUser);
    }
}
