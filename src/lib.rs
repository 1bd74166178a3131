//! # Canvasflow — a callback-driven canvas execution engine
//!
//! `canvasflow` compiles a visually-authored graph of work units — AI/media
//! generation steps, human-approval gates, fan-out/fan-in branches — into a
//! validated execution graph, and drives each run forward as out-of-process
//! work units report completion through callbacks.
//!
//! - **Compilation**: cycle detection over journey edges, forward/backward
//!   adjacency indexing, edge-data indexing, entry/terminal discovery, and
//!   movement-rule cross-reference validation, with every diagnostic
//!   collected before the verdict.
//! - **Execution**: a five-status node state machine guarded by a pure
//!   transition table, dependency-driven edge walking, ordered merging of
//!   upstream outputs, and the splitter/collector protocol for parallel
//!   paths.
//! - **Collaborators**: work units, run persistence, and entity movement
//!   are traits; in-memory and HTTP implementations ship in the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use canvasflow::dsl::{parse_canvas, CanvasFormat};
//! use canvasflow::engine::RunDispatcher;
//! use canvasflow::graph::CanvasCompiler;
//!
//! #[tokio::main]
//! async fn main() {
//!     let doc = std::fs::read_to_string("canvas.json").unwrap();
//!     let schema = parse_canvas(&doc, CanvasFormat::Json).unwrap();
//!     let graph = CanvasCompiler::compile(&schema).unwrap();
//!     let dispatcher = RunDispatcher::builder(Arc::new(graph)).build();
//!     let run = dispatcher.start_run().await.unwrap();
//!     println!("{:?}", run.status_summary());
//! }
//! ```

pub mod dsl;
pub mod engine;
pub mod error;
pub mod graph;
pub mod movement;
pub mod state;
pub mod workers;

pub use crate::dsl::{parse_canvas, CanvasFormat, CanvasSchema, EdgeKind, NodeKind};
pub use crate::engine::{
    merge_upstream_outputs, upstream_dependencies_completed, DispatcherConfig, RunDispatcher,
};
pub use crate::error::{CompileError, CompileErrorKind, EngineError, EngineResult, NodeError};
pub use crate::graph::{CanvasCompiler, ExecutionGraph};
pub use crate::movement::{EntityMover, MovementOutcome, NoopMover};
pub use crate::state::{
    ensure_valid_transition, is_valid_transition, MemoryRunStore, NodeState, NodeStatus, Run,
    RunStore,
};
pub use crate::workers::{
    CallbackOutcome, CallbackStatus, FireRequest, Fired, HttpWorkUnit, WorkUnitExecutor,
    WorkUnitRegistry,
};
