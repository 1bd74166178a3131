//! Work-unit execution contract.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NodeError;

/// Everything a work unit needs to perform one node's work and report back.
#[derive(Debug, Clone, Serialize)]
pub struct FireRequest {
    pub run_id: String,
    /// Entry id — augmented (`"{base}_{index}"`) inside a parallel path.
    pub node_id: String,
    pub config: Value,
    /// Merged upstream outputs.
    pub input: HashMap<String, Value>,
    /// Where completion is reported:
    /// `{base_url}/callback/{run_id}/{node_id}`.
    pub callback_url: String,
}

/// Terminal status carried by a completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

/// Completion report: the JSON body of `POST /callback/{run_id}/{node_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackOutcome {
    pub status: CallbackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallbackOutcome {
    pub fn completed(output: Value) -> Self {
        CallbackOutcome {
            status: CallbackStatus::Completed,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        CallbackOutcome {
            status: CallbackStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// What the hand-off produced.
#[derive(Debug)]
pub enum Fired {
    /// The unit accepted the work and will report later via callback.
    Accepted,
    /// The unit finished synchronously; the outcome is applied inline.
    Done(CallbackOutcome),
}

/// One work-unit kind. Implementations either do the work before returning
/// (`Fired::Done`) or hand off to an external process (`Fired::Accepted`).
#[async_trait]
pub trait WorkUnitExecutor: Send + Sync {
    async fn fire(&self, request: &FireRequest) -> Result<Fired, NodeError>;
}
