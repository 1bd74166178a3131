//! Work-unit collaborators.
//!
//! Each worker node hands off to a [`WorkUnitExecutor`] looked up by kind in
//! the [`WorkUnitRegistry`] — an explicit, constructed-at-startup table, not
//! a global singleton. The concrete generation services live out of process
//! and report back through the callback contract.

pub mod executor;
pub mod http;
pub mod registry;

pub use executor::{CallbackOutcome, CallbackStatus, FireRequest, Fired, WorkUnitExecutor};
pub use http::HttpWorkUnit;
pub use registry::{WorkUnitRegistry, KNOWN_WORK_UNIT_KINDS};
