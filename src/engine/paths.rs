//! Parallel-path protocol: augmented-identifier naming and fan-in
//! aggregation.
//!
//! A splitter expands an array into augmented run entries
//! `"{splitter}_{index}"`, index assigned in array order and never
//! renumbered. Downstream template nodes are instantiated once per path
//! under the same naming scheme, and the collector folds the paths back
//! into one ordered array.

use serde_json::Value;

use crate::dsl::schema::NodeKind;
use crate::graph::ExecutionGraph;
use crate::state::{NodeState, NodeStatus, Run};

/// `"{base}_{index}"`.
pub fn augmented_id(base: &str, index: usize) -> String {
    format!("{base}_{index}")
}

/// Resolve a run-map key back to `(base, path index)`.
///
/// Graph node ids win over suffix parsing: a node legitimately named
/// `render_2` is itself, not path 2 of `render`.
pub fn split_entry_id<'a>(graph: &ExecutionGraph, entry_id: &'a str) -> (&'a str, Option<usize>) {
    if graph.contains(entry_id) {
        return (entry_id, None);
    }
    if let Some(pos) = entry_id.rfind('_') {
        let (base, suffix) = (&entry_id[..pos], &entry_id[pos + 1..]);
        if graph.contains(base) {
            if let Ok(index) = suffix.parse::<usize>() {
                return (base, Some(index));
            }
        }
    }
    (entry_id, None)
}

/// All augmented entries for a base id, ascending by numeric suffix.
/// Keys that are graph nodes in their own right are never counted as paths.
pub(crate) fn collect_paths<'a>(
    base: &str,
    graph: &ExecutionGraph,
    run: &'a Run,
) -> Vec<(usize, &'a NodeState)> {
    let prefix = format!("{base}_");
    let mut paths: Vec<(usize, &NodeState)> = run
        .node_states
        .iter()
        .filter(|(key, _)| !graph.contains(key))
        .filter_map(|(key, state)| {
            key.strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<usize>().ok())
                .map(|index| (index, state))
        })
        .collect();
    paths.sort_by_key(|(index, _)| *index);
    paths
}

/// Outcome of one collector evaluation.
#[derive(Debug)]
pub(crate) enum FanIn {
    /// Some path is still pending or running; re-evaluated on a later walk.
    Pending,
    /// At least one path failed.
    Failed(String),
    /// Every path completed; outputs ordered by suffix, sources in
    /// inbound-edge order.
    Complete(Vec<Value>),
}

/// Evaluate a collector against a live run snapshot.
///
/// Failure wins over waiting: one failed path fails the collector even
/// while siblings are still running.
pub(crate) fn evaluate_fan_in(
    collector_id: &str,
    graph: &ExecutionGraph,
    run: &Run,
    empty_fanout_completes: bool,
) -> FanIn {
    let sources = graph.journey_sources(collector_id);

    // Pass 1: look for a failed path anywhere.
    for source in sources {
        for (index, state) in collect_paths(source, graph, run) {
            if state.status == NodeStatus::Failed {
                return FanIn::Failed(failed_path_message(&augmented_id(source, index), state));
            }
        }
        if let Some(state) = run.state(source) {
            if state.status == NodeStatus::Failed && collect_paths(source, graph, run).is_empty() {
                return FanIn::Failed(failed_path_message(source, state));
            }
        }
    }

    // Pass 2: aggregate, or report not-ready.
    let mut output = Vec::new();
    for source in sources {
        let paths = collect_paths(source, graph, run);
        if paths.is_empty() {
            match run.state(source) {
                Some(state) if state.status == NodeStatus::Completed => {
                    let value = state.output.clone().unwrap_or(Value::Null);
                    let is_splitter =
                        graph.node(source).map(|n| n.kind) == Some(NodeKind::Splitter);
                    match value {
                        // A splitter that fanned out to nothing contributes
                        // zero elements, not an empty-array element.
                        Value::Array(items) if is_splitter && items.is_empty() => {}
                        other => output.push(other),
                    }
                }
                _ => {
                    if empty_fanout_completes && empty_fan_out_confirmed(source, graph, run) {
                        continue;
                    }
                    return FanIn::Pending;
                }
            }
        } else {
            if paths
                .iter()
                .any(|(_, state)| state.status != NodeStatus::Completed)
            {
                return FanIn::Pending;
            }
            for (_, state) in paths {
                output.push(state.output.clone().unwrap_or(Value::Null));
            }
        }
    }
    FanIn::Complete(output)
}

fn failed_path_message(entry_id: &str, state: &NodeState) -> String {
    match &state.error {
        Some(error) => format!("upstream path '{entry_id}' failed: {error}"),
        None => format!("upstream path '{entry_id}' failed"),
    }
}

/// Whether a template with no augmented entries sits downstream of a
/// splitter that completed with an empty array — the one situation where
/// "no paths" means "zero paths" rather than "not fanned out yet".
fn empty_fan_out_confirmed(source: &str, graph: &ExecutionGraph, run: &Run) -> bool {
    let mut queue = vec![source];
    let mut visited = std::collections::HashSet::new();
    while let Some(id) = queue.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = graph.node(id) else { continue };
        if node.kind == NodeKind::Splitter {
            return matches!(
                run.state(id),
                Some(state)
                    if state.status == NodeStatus::Completed
                        && matches!(&state.output, Some(Value::Array(items)) if items.is_empty())
            );
        }
        queue.extend(graph.journey_sources(id).iter().map(String::as_str));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_canvas, CanvasFormat};
    use crate::graph::CanvasCompiler;
    use serde_json::json;

    fn parallel_graph() -> ExecutionGraph {
        // split -> render (template) -> gather
        let schema = parse_canvas(
            r#"{
            "nodes": [
                {"id": "split", "kind": "splitter", "config": {"split_field": "scenes"}},
                {"id": "render", "kind": "worker", "config": {"worker": "video_generation"}},
                {"id": "gather", "kind": "collector", "config": {}}
            ],
            "edges": [
                {"source": "split", "target": "render"},
                {"source": "render", "target": "gather"}
            ]
        }"#,
            CanvasFormat::Json,
        )
        .unwrap();
        CanvasCompiler::compile(&schema).unwrap()
    }

    #[test]
    fn test_augmented_id_format() {
        assert_eq!(augmented_id("render", 0), "render_0");
        assert_eq!(augmented_id("render", 12), "render_12");
    }

    #[test]
    fn test_split_entry_id_prefers_graph_nodes() {
        let graph = parallel_graph();
        assert_eq!(split_entry_id(&graph, "render"), ("render", None));
        assert_eq!(split_entry_id(&graph, "render_3"), ("render", Some(3)));
        // Unknown key with no graph base stays itself.
        assert_eq!(split_entry_id(&graph, "mystery_7"), ("mystery_7", None));
    }

    #[test]
    fn test_collect_paths_sorted_by_suffix() {
        let graph = parallel_graph();
        let mut run = Run::new(&graph);
        for index in [2usize, 0, 1] {
            run.node_states.insert(
                augmented_id("render", index),
                NodeState::completed(Some(json!(index))),
            );
        }
        let paths = collect_paths("render", &graph, &run);
        let order: Vec<usize> = paths.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_fan_in_waits_then_completes_in_suffix_order() {
        let graph = parallel_graph();
        let mut run = Run::new(&graph);
        run.node_states
            .insert("render_1".into(), NodeState::completed(Some(json!("b"))));
        run.node_states
            .insert("render_0".into(), NodeState::running());
        assert!(matches!(
            evaluate_fan_in("gather", &graph, &run, true),
            FanIn::Pending
        ));

        run.node_states
            .insert("render_0".into(), NodeState::completed(Some(json!("a"))));
        match evaluate_fan_in("gather", &graph, &run, true) {
            FanIn::Complete(items) => assert_eq!(items, vec![json!("a"), json!("b")]),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_fan_in_failure_beats_waiting() {
        let graph = parallel_graph();
        let mut run = Run::new(&graph);
        run.node_states
            .insert("render_0".into(), NodeState::running());
        run.node_states
            .insert("render_1".into(), NodeState::failed("render crashed"));
        match evaluate_fan_in("gather", &graph, &run, true) {
            FanIn::Failed(message) => {
                assert!(message.contains("render_1"));
                assert!(message.contains("render crashed"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_fan_in_empty_fanout_policy() {
        let graph = parallel_graph();
        let mut run = Run::new(&graph);
        // Splitter completed with an empty array, no paths anywhere.
        run.node_states
            .insert("split".into(), NodeState::completed(Some(json!([]))));
        match evaluate_fan_in("gather", &graph, &run, true) {
            FanIn::Complete(items) => assert!(items.is_empty()),
            other => panic!("expected empty completion, got {other:?}"),
        }
        // Strict policy keeps it pending.
        assert!(matches!(
            evaluate_fan_in("gather", &graph, &run, false),
            FanIn::Pending
        ));
    }

    #[test]
    fn test_fan_in_pending_before_any_fan_out() {
        let graph = parallel_graph();
        let run = Run::new(&graph);
        assert!(matches!(
            evaluate_fan_in("gather", &graph, &run, true),
            FanIn::Pending
        ));
    }
}
