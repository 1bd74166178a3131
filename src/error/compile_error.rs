//! Compile-time diagnostics.
//!
//! Compilation never stops at the first problem: every structural,
//! topological, and cross-reference violation is collected into one list,
//! and either a full [`ExecutionGraph`](crate::graph::ExecutionGraph) or the
//! full list is returned, never both.

use std::fmt;

use serde::Serialize;

/// Category of a compile-time error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileErrorKind {
    /// A journey-edge cycle (self-loops included).
    Cycle,
    /// A movement rule referencing an unknown node or a value outside the
    /// allowed outcome sets.
    InvalidEntityMovement,
    /// A worker node naming an unknown work-unit kind.
    InvalidWorker,
    /// Any other structural problem: duplicate ids, dangling edge
    /// endpoints, unparseable documents.
    InvalidNodeConfig,
}

impl CompileErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompileErrorKind::Cycle => "cycle",
            CompileErrorKind::InvalidEntityMovement => "invalid_entity_movement",
            CompileErrorKind::InvalidWorker => "invalid_worker",
            CompileErrorKind::InvalidNodeConfig => "invalid_node_config",
        }
    }
}

/// One compile-time diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// The node the diagnostic anchors to, when one can be named.
    pub node_id: Option<String>,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, node_id: Option<String>, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            node_id,
            message: message.into(),
        }
    }

    pub fn cycle(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::Cycle, Some(node_id.into()), message)
    }

    pub fn invalid_movement(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            CompileErrorKind::InvalidEntityMovement,
            Some(node_id.into()),
            message,
        )
    }

    pub fn invalid_worker(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::InvalidWorker, Some(node_id.into()), message)
    }

    pub fn invalid_config(node_id: Option<String>, message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::InvalidNodeConfig, node_id, message)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{}: {} (node: {})", self.kind.as_str(), self.message, id),
            None => write!(f, "{}: {}", self.kind.as_str(), self.message),
        }
    }
}

impl std::error::Error for CompileError {}
