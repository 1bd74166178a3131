//! Canvas document schema.
//!
//! Node identifiers are preserved verbatim everywhere — reserved-looking
//! names (`__proto__`, `constructor`) are ordinary map keys, never rewritten
//! or slugified.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Allowed values for a movement rule's `complete_as` outcome.
pub const COMPLETE_AS_VALUES: &[&str] = &["success", "failure", "neutral"];

/// Allowed values for a movement rule's `set_entity_type` outcome.
pub const ENTITY_TYPE_VALUES: &[&str] = &["customer", "churned", "lead"];

/// A canvas document as saved by the visual builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasSchema {
    /// Canvas identifier, carried into the compiled graph.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

/// One authored node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    pub kind: NodeKind,
    /// Kind-specific configuration, opaque key/value.
    #[serde(default)]
    pub config: Value,
    /// Movement rule applied when a worker completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<MovementRule>,
    /// Movement rule applied when a worker fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<MovementRule>,

    // Presentation attributes. Accepted from the builder, stripped by the
    // compiler — they never reach the execution graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CanvasPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<CanvasSize>,
    /// Id of the section/group this node is drawn inside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A unit of external work (generation step, webhook call).
    Worker,
    /// A human-approval gate; the run pauses here until resumed.
    HumanGate,
    /// Fan-out: expands an array input into parallel paths.
    Splitter,
    /// Fan-in: aggregates parallel paths into one ordered array.
    Collector,
    /// Visual grouping only; ignored by the compiler.
    Section,
    /// Free-floating annotation; ignored by the compiler.
    Note,
}

impl NodeKind {
    /// Whether this kind participates in execution at all.
    pub fn is_executable(&self) -> bool {
        !matches!(self, NodeKind::Section | NodeKind::Note)
    }
}

/// A directed connection between two node identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: EdgeKind,
    /// Opaque data-mapping object attached to the edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Edge kind.
///
/// Only `journey` edges create an execution dependency. `system` edges are
/// still traversed by the walker but never gate on completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Journey,
    System,
}

/// Result-movement rule on a worker node: when the worker reaches the
/// matching terminal status, the external entity record is moved to the
/// named node, completing the current step with the given outcome.
///
/// Outcome fields stay as raw strings here so the compiler can report
/// violations as typed diagnostics instead of parse failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRule {
    /// Target node identifier the entity moves to.
    pub move_to: String,
    /// How the current step is recorded: `success`, `failure`, or `neutral`.
    pub complete_as: String,
    /// Optional entity relabel: `customer`, `churned`, or `lead`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_entity_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_kind_snake_case() {
        let kind: NodeKind = serde_json::from_value(json!("human_gate")).unwrap();
        assert_eq!(kind, NodeKind::HumanGate);
        assert!(kind.is_executable());

        let kind: NodeKind = serde_json::from_value(json!("section")).unwrap();
        assert!(!kind.is_executable());
    }

    #[test]
    fn test_edge_kind_defaults_to_journey() {
        let edge: CanvasEdge =
            serde_json::from_value(json!({"source": "a", "target": "b"})).unwrap();
        assert_eq!(edge.kind, EdgeKind::Journey);
        assert!(edge.data.is_none());
    }

    #[test]
    fn test_reserved_looking_id_round_trips() {
        let node: CanvasNode = serde_json::from_value(json!({
            "id": "__proto__",
            "kind": "worker",
            "config": {"worker": "image_generation"}
        }))
        .unwrap();
        assert_eq!(node.id, "__proto__");
    }
}
