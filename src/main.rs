use std::sync::Arc;

use serde_json::json;

use canvasflow::dsl::{parse_canvas, CanvasFormat};
use canvasflow::engine::RunDispatcher;
use canvasflow::graph::CanvasCompiler;
use canvasflow::workers::{
    CallbackOutcome, FireRequest, Fired, WorkUnitExecutor, WorkUnitRegistry,
};
use canvasflow::NodeError;

/// Stand-in for an out-of-process planning service: accepts the work and
/// reports later through the callback contract.
struct Planner;

#[async_trait::async_trait]
impl WorkUnitExecutor for Planner {
    async fn fire(&self, _request: &FireRequest) -> Result<Fired, NodeError> {
        Ok(Fired::Accepted)
    }
}

/// In-process render stand-in: completes synchronously with a payload
/// derived from its per-path input.
struct LocalRender;

#[async_trait::async_trait]
impl WorkUnitExecutor for LocalRender {
    async fn fire(&self, request: &FireRequest) -> Result<Fired, NodeError> {
        let scene = request
            .input
            .get("scene")
            .cloned()
            .unwrap_or_else(|| json!("untitled"));
        Ok(Fired::Done(CallbackOutcome::completed(json!({
            "scene": scene,
            "asset": format!("local://{}", request.node_id),
        }))))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Canvasflow Engine ===\n");

    let canvas = r#"{
        "name": "teaser-pipeline",
        "nodes": [
            {"id": "brief", "kind": "worker", "config": {"worker": "text_generation"}},
            {"id": "storyboard", "kind": "splitter", "config": {"split_field": "scenes"}},
            {"id": "render", "kind": "worker", "config": {"worker": "video_generation"}},
            {"id": "assemble", "kind": "collector", "config": {}},
            {"id": "signoff", "kind": "human_gate", "config": {}}
        ],
        "edges": [
            {"source": "brief", "target": "storyboard"},
            {"source": "storyboard", "target": "render"},
            {"source": "render", "target": "assemble"},
            {"source": "assemble", "target": "signoff"}
        ]
    }"#;

    let schema = parse_canvas(canvas, CanvasFormat::Json).expect("demo canvas parses");
    let graph = match CanvasCompiler::compile(&schema) {
        Ok(graph) => graph,
        Err(errors) => {
            for error in errors {
                eprintln!("compile error: {error}");
            }
            std::process::exit(1);
        }
    };

    let mut registry = WorkUnitRegistry::new();
    registry.register("text_generation", Arc::new(Planner));
    registry.register("video_generation", Arc::new(LocalRender));

    let dispatcher = RunDispatcher::builder(Arc::new(graph))
        .with_registry(Arc::new(registry))
        .build();

    let run = dispatcher.start_run().await.expect("run starts");
    println!("run {} started; brief is {}\n", run.id, run.node_states["brief"].status);

    // The planning service finishes and calls back with the storyboard.
    // The splitter fans the scenes out, each render completes in-process,
    // the collector assembles them, and the gate parks the run.
    let run = dispatcher
        .handle_callback(
            &run.id,
            "brief",
            CallbackOutcome::completed(json!({
                "scenes": [
                    {"scene": "cold open"},
                    {"scene": "product shot"},
                    {"scene": "call to action"}
                ]
            })),
        )
        .await
        .expect("brief callback applies");

    let mut entries: Vec<_> = run.node_states.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (entry, state) in entries {
        println!("  {entry:<14} {}", state.status);
    }

    let run = dispatcher
        .resume_gate(&run.id, "signoff", Some(json!({"approved_by": "demo"})))
        .await
        .expect("gate resumes");

    println!("\nafter sign-off: {:?}", run.status_summary());
}
