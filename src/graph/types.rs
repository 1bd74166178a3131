//! Compiled execution graph types.

use std::collections::HashMap;

use serde_json::Value;

use crate::dsl::schema::{EdgeKind, MovementRule, NodeKind};

/// An execution node with presentation attributes stripped.
#[derive(Debug, Clone)]
pub struct ExecNode {
    pub id: String,
    pub kind: NodeKind,
    pub config: Value,
    pub on_success: Option<MovementRule>,
    pub on_failure: Option<MovementRule>,
}

/// One compiled edge.
#[derive(Debug, Clone)]
pub struct ExecEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// Key for the edge-data index: `"{source}->{target}"`.
pub fn edge_key(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

/// The compiled, immutable-per-run artifact.
///
/// All id-keyed lookups go through explicit `HashMap`s so identifiers like
/// `__proto__` behave as ordinary keys. Edge vectors preserve authored
/// order; that order is the documented, stable iteration order for
/// dependency resolution and input merging.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    pub id: String,
    /// Node table, execution kinds only.
    pub nodes: HashMap<String, ExecNode>,
    /// All outbound edges per node, any kind, authored order.
    pub adjacency: HashMap<String, Vec<ExecEdge>>,
    /// Journey-only reverse index: target -> ordered source ids. Every
    /// execution node has an entry, possibly empty.
    pub inbound_edges: HashMap<String, Vec<String>>,
    /// Edge-attached mapping objects keyed `"{source}->{target}"`.
    pub edge_data: HashMap<String, Value>,
    /// Nodes with no inbound journey edge, authored order.
    pub entry_nodes: Vec<String>,
    /// Nodes with no outbound edge of any kind, authored order.
    pub terminal_nodes: Vec<String>,
}

impl ExecutionGraph {
    pub fn node(&self, id: &str) -> Option<&ExecNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All outbound edges of a node, empty when it has none.
    pub fn outbound(&self, id: &str) -> &[ExecEdge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Journey-edge sources of a node, empty when it is dependency-free.
    pub fn journey_sources(&self, id: &str) -> &[String] {
        self.inbound_edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}
