//! The execution engine: dependency evaluation, input merging, the
//! parallel-path protocol, and the edge-walking dispatcher.

pub mod dependency;
pub mod dispatcher;
pub mod paths;

pub use dependency::{merge_upstream_outputs, upstream_dependencies_completed};
pub use dispatcher::{DispatcherConfig, RunDispatcher, RunDispatcherBuilder};
pub use paths::{augmented_id, split_entry_id};
