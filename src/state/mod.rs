//! Run state: node status machine, run records, and persistence.
//!
//! A [`Run`] is mutable only through [`RunStore::update_node_states`], and
//! every write path validates the transition first via
//! [`ensure_valid_transition`].

pub mod run;
pub mod status;
pub mod store;

pub use run::{NodeState, Run, StatusSummary};
pub use status::{ensure_valid_transition, is_valid_transition, NodeStatus};
pub use store::{MemoryRunStore, RunStore};
