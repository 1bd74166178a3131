//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use canvasflow::dsl::{parse_canvas, CanvasFormat};
use canvasflow::graph::{CanvasCompiler, ExecutionGraph};
use canvasflow::workers::{CallbackOutcome, FireRequest, Fired, WorkUnitExecutor};
use canvasflow::NodeError;

pub fn compile(json: &str) -> ExecutionGraph {
    let schema = parse_canvas(json, CanvasFormat::Json).expect("fixture parses");
    CanvasCompiler::compile(&schema).expect("fixture compiles")
}

/// Accepts the hand-off and waits for an external callback, recording
/// which entries fired and how often.
#[derive(Default)]
pub struct HoldingUnit {
    pub fired: Mutex<Vec<String>>,
}

impl HoldingUnit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fired_entries(&self) -> Vec<String> {
        self.fired.lock().clone()
    }
}

#[async_trait]
impl WorkUnitExecutor for HoldingUnit {
    async fn fire(&self, request: &FireRequest) -> Result<Fired, NodeError> {
        self.fired.lock().push(request.node_id.clone());
        Ok(Fired::Accepted)
    }
}

/// Completes synchronously, echoing its merged input back as output.
pub struct EchoUnit;

#[async_trait]
impl WorkUnitExecutor for EchoUnit {
    async fn fire(&self, request: &FireRequest) -> Result<Fired, NodeError> {
        let input = serde_json::Value::Object(request.input.clone().into_iter().collect());
        Ok(Fired::Done(CallbackOutcome::completed(json!({
            "from": request.node_id,
            "input": input,
        }))))
    }
}

/// Always fails the hand-off synchronously.
pub struct FailingUnit;

#[async_trait]
impl WorkUnitExecutor for FailingUnit {
    async fn fire(&self, _request: &FireRequest) -> Result<Fired, NodeError> {
        Err(NodeError::Unreachable("connection refused".to_string()))
    }
}

/// Fails the first hand-off, succeeds afterwards — for retry flows.
#[derive(Default)]
pub struct FlakyUnit {
    attempts: AtomicUsize,
}

impl FlakyUnit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl WorkUnitExecutor for FlakyUnit {
    async fn fire(&self, request: &FireRequest) -> Result<Fired, NodeError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(NodeError::Rejected { status: 503 })
        } else {
            Ok(Fired::Done(CallbackOutcome::completed(json!({
                "from": request.node_id,
            }))))
        }
    }
}
