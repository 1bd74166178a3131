//! Canvas document model and parsing.
//!
//! A canvas document is what the visual builder saves: nodes, edges, and
//! presentation attributes. [`parse_canvas`] turns raw JSON/YAML text into a
//! [`CanvasSchema`], which the [`CanvasCompiler`](crate::graph::CanvasCompiler)
//! then validates and compiles.

pub mod parser;
pub mod schema;

pub use parser::{parse_canvas, CanvasFormat};
pub use schema::{
    CanvasEdge, CanvasNode, CanvasSchema, EdgeKind, MovementRule, NodeKind, COMPLETE_AS_VALUES,
    ENTITY_TYPE_VALUES,
};
