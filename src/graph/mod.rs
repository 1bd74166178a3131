//! Execution graph construction and representation.
//!
//! The [`ExecutionGraph`] is compiled from a [`CanvasSchema`](crate::dsl::CanvasSchema)
//! by [`CanvasCompiler::compile`]. It holds the node table, forward and
//! journey-reverse adjacency, edge-attached data, and the entry/terminal
//! sets the [`RunDispatcher`](crate::engine::RunDispatcher) walks.

pub mod compiler;
mod cycle;
pub mod types;

pub use compiler::CanvasCompiler;
pub use types::{edge_key, ExecEdge, ExecNode, ExecutionGraph};
