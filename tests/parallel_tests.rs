mod common;

use std::sync::Arc;

use serde_json::json;

use canvasflow::engine::{DispatcherConfig, RunDispatcher};
use canvasflow::workers::{CallbackOutcome, WorkUnitRegistry};
use canvasflow::NodeStatus;

use common::{compile, EchoUnit, HoldingUnit};

const PARALLEL: &str = r#"{
    "nodes": [
        {"id": "brief", "kind": "worker", "config": {"worker": "text_generation"}},
        {"id": "storyboard", "kind": "splitter", "config": {"split_field": "scenes"}},
        {"id": "render", "kind": "worker", "config": {"worker": "video_generation"}},
        {"id": "assemble", "kind": "collector", "config": {}}
    ],
    "edges": [
        {"source": "brief", "target": "storyboard"},
        {"source": "storyboard", "target": "render"},
        {"source": "render", "target": "assemble"}
    ]
}"#;

struct Fixture {
    dispatcher: RunDispatcher,
    renders: Arc<HoldingUnit>,
}

fn parallel_fixture(config: Option<DispatcherConfig>) -> Fixture {
    let renders = HoldingUnit::new();
    let unit = renders.clone();
    let mut registry = WorkUnitRegistry::new();
    registry.register("text_generation", HoldingUnit::new());
    registry.register("video_generation", unit);
    let mut builder = RunDispatcher::builder(Arc::new(compile(PARALLEL)))
        .with_registry(Arc::new(registry));
    if let Some(config) = config {
        builder = builder.with_config(config);
    }
    Fixture {
        dispatcher: builder.build(),
        renders,
    }
}

fn scenes(n: usize) -> CallbackOutcome {
    let scenes: Vec<_> = (0..n).map(|i| json!({"scene": i})).collect();
    CallbackOutcome::completed(json!({ "scenes": scenes }))
}

#[tokio::test]
async fn test_fan_out_creates_augmented_entries() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run = fx
        .dispatcher
        .handle_callback(&run.id, "brief", scenes(3))
        .await
        .unwrap();

    assert_eq!(run.status_of("storyboard"), Some(NodeStatus::Completed));
    for index in 0..3 {
        let path = run.state(&format!("storyboard_{index}")).unwrap();
        assert_eq!(path.status, NodeStatus::Completed);
        assert_eq!(path.output, Some(json!({"scene": index})));
        assert_eq!(
            run.status_of(&format!("render_{index}")),
            Some(NodeStatus::Running)
        );
    }
    assert!(run.state("storyboard_3").is_none());
    // The template itself never runs; only its instances do.
    assert_eq!(run.status_of("render"), Some(NodeStatus::Pending));
    assert_eq!(run.status_of("assemble"), Some(NodeStatus::Pending));
    assert_eq!(
        fx.renders.fired_entries(),
        vec!["render_0", "render_1", "render_2"]
    );
}

#[tokio::test]
async fn test_collector_orders_by_suffix_not_completion_order() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run_id = run.id.clone();
    fx.dispatcher
        .handle_callback(&run_id, "brief", scenes(3))
        .await
        .unwrap();

    // Siblings complete out of order.
    for index in [2usize, 0, 1] {
        fx.dispatcher
            .handle_callback(
                &run_id,
                &format!("render_{index}"),
                CallbackOutcome::completed(json!({"asset": format!("clip-{index}")})),
            )
            .await
            .unwrap();
    }

    let run = fx.dispatcher.get_run(&run_id).await.unwrap();
    let assemble = run.state("assemble").unwrap();
    assert_eq!(assemble.status, NodeStatus::Completed);
    assert_eq!(
        assemble.output,
        Some(json!([
            {"asset": "clip-0"},
            {"asset": "clip-1"},
            {"asset": "clip-2"}
        ]))
    );
    assert!(run.is_settled());
}

#[tokio::test]
async fn test_collector_waits_while_siblings_run() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run_id = run.id.clone();
    fx.dispatcher
        .handle_callback(&run_id, "brief", scenes(2))
        .await
        .unwrap();

    let run = fx
        .dispatcher
        .handle_callback(
            &run_id,
            "render_0",
            CallbackOutcome::completed(json!({"asset": "clip-0"})),
        )
        .await
        .unwrap();
    assert_eq!(run.status_of("assemble"), Some(NodeStatus::Pending));
}

#[tokio::test]
async fn test_one_failed_path_fails_the_collector() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run_id = run.id.clone();
    fx.dispatcher
        .handle_callback(&run_id, "brief", scenes(3))
        .await
        .unwrap();

    fx.dispatcher
        .handle_callback(
            &run_id,
            "render_0",
            CallbackOutcome::completed(json!({"asset": "clip-0"})),
        )
        .await
        .unwrap();
    let run = fx
        .dispatcher
        .handle_callback(
            &run_id,
            "render_1",
            CallbackOutcome::failed("render crashed"),
        )
        .await
        .unwrap();

    // render_2 is still running, but failure does not wait.
    let assemble = run.state("assemble").unwrap();
    assert_eq!(assemble.status, NodeStatus::Failed);
    let error = assemble.error.as_deref().unwrap();
    assert!(error.contains("render_1"));
    assert!(error.contains("render crashed"));
}

#[tokio::test]
async fn test_concurrent_sibling_callbacks_both_land() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run_id = run.id.clone();
    fx.dispatcher
        .handle_callback(&run_id, "brief", scenes(2))
        .await
        .unwrap();

    let (left, right) = tokio::join!(
        fx.dispatcher.handle_callback(
            &run_id,
            "render_0",
            CallbackOutcome::completed(json!({"asset": "clip-0"})),
        ),
        fx.dispatcher.handle_callback(
            &run_id,
            "render_1",
            CallbackOutcome::completed(json!({"asset": "clip-1"})),
        ),
    );
    left.unwrap();
    right.unwrap();

    let run = fx.dispatcher.get_run(&run_id).await.unwrap();
    assert_eq!(run.status_of("render_0"), Some(NodeStatus::Completed));
    assert_eq!(run.status_of("render_1"), Some(NodeStatus::Completed));
    assert_eq!(run.status_of("assemble"), Some(NodeStatus::Completed));
    assert_eq!(
        run.state("assemble").unwrap().output,
        Some(json!([{"asset": "clip-0"}, {"asset": "clip-1"}]))
    );
}

#[tokio::test]
async fn test_zero_fan_out_completes_collector_with_empty_array() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run = fx
        .dispatcher
        .handle_callback(&run.id, "brief", scenes(0))
        .await
        .unwrap();

    assert_eq!(run.status_of("storyboard"), Some(NodeStatus::Completed));
    assert!(run.state("storyboard_0").is_none());
    assert!(fx.renders.fired_entries().is_empty());
    let assemble = run.state("assemble").unwrap();
    assert_eq!(assemble.status, NodeStatus::Completed);
    assert_eq!(assemble.output, Some(json!([])));
}

#[tokio::test]
async fn test_zero_fan_out_strict_policy_leaves_collector_pending() {
    let fx = parallel_fixture(Some(DispatcherConfig {
        empty_fanout_completes_collector: false,
        ..DispatcherConfig::default()
    }));
    let run = fx.dispatcher.start_run().await.unwrap();
    let run = fx
        .dispatcher
        .handle_callback(&run.id, "brief", scenes(0))
        .await
        .unwrap();

    assert_eq!(run.status_of("storyboard"), Some(NodeStatus::Completed));
    assert_eq!(run.status_of("assemble"), Some(NodeStatus::Pending));
}

#[tokio::test]
async fn test_splitter_rejects_non_array_input() {
    let fx = parallel_fixture(None);
    let run = fx.dispatcher.start_run().await.unwrap();
    let run = fx
        .dispatcher
        .handle_callback(
            &run.id,
            "brief",
            CallbackOutcome::completed(json!({"scenes": "not an array"})),
        )
        .await
        .unwrap();

    let storyboard = run.state("storyboard").unwrap();
    assert_eq!(storyboard.status, NodeStatus::Failed);
    assert!(storyboard.error.as_deref().unwrap().contains("scenes"));
}

#[tokio::test]
async fn test_paths_share_template_config_but_see_their_own_input() {
    // Swap the render unit for a synchronous echo so each path's output
    // records the per-path input it saw.
    let mut registry = WorkUnitRegistry::new();
    registry.register("text_generation", HoldingUnit::new());
    registry.register("video_generation", Arc::new(EchoUnit));
    let dispatcher = RunDispatcher::builder(Arc::new(compile(PARALLEL)))
        .with_registry(Arc::new(registry))
        .build();

    let run = dispatcher.start_run().await.unwrap();
    let run = dispatcher
        .handle_callback(&run.id, "brief", scenes(2))
        .await
        .unwrap();

    let assemble = run.state("assemble").unwrap();
    assert_eq!(assemble.status, NodeStatus::Completed);
    let outputs = assemble.output.as_ref().unwrap().as_array().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0]["from"], json!("render_0"));
    assert_eq!(outputs[0]["input"]["scene"], json!(0));
    assert_eq!(outputs[1]["from"], json!("render_1"));
    assert_eq!(outputs[1]["input"]["scene"], json!(1));
}
