//! Firing errors at the work-unit boundary.
//!
//! These never escape the dispatcher: a synchronous firing failure is
//! converted into a `failed` node state so one branch's fault cannot abort
//! the walk of independent branches.

use thiserror::Error;

/// Errors raised while handing a node off to its work unit.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Unknown work-unit kind: {0}")]
    UnknownWorkerKind(String),
    #[error("Worker config has no endpoint")]
    MissingEndpoint,
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("Work unit rejected the hand-off with status {status}")]
    Rejected { status: u16 },
    #[error("Firing timed out after {secs}s")]
    FiringTimeout { secs: u64 },
    #[error("Invalid node config: {0}")]
    InvalidConfig(String),
}
