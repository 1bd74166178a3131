//! Dependency satisfaction and upstream-output merging.
//!
//! Both are parallel-path aware: inside path `i`, an upstream source `s`
//! resolves to the augmented entry `"{s}_{i}"` when that entry exists, and
//! to the base entry otherwise.

use std::collections::HashMap;

use serde_json::Value;

use crate::graph::ExecutionGraph;
use crate::state::{NodeState, NodeStatus, Run};

use super::paths::augmented_id;

/// Resolve the run entry standing in for `source` on a given path.
pub(crate) fn resolve_entry<'a>(
    run: &'a Run,
    source: &str,
    path: Option<usize>,
) -> Option<&'a NodeState> {
    if let Some(index) = path {
        if let Some(state) = run.state(&augmented_id(source, index)) {
            return Some(state);
        }
    }
    run.state(source)
}

/// True when every journey-edge source of the node is `completed` in the
/// run. A node with no journey-inbound edges is always ready; an absent or
/// unknown source entry counts as not-completed.
pub fn upstream_dependencies_completed(
    node_id: &str,
    path: Option<usize>,
    graph: &ExecutionGraph,
    run: &Run,
) -> bool {
    graph.journey_sources(node_id).iter().all(|source| {
        resolve_entry(run, source, path)
            .map(|state| state.status == NodeStatus::Completed)
            .unwrap_or(false)
    })
}

/// Merge the outputs of completed upstream sources into one input map.
///
/// Sources are processed in authored edge order. Plain objects
/// shallow-merge key by key, so a later source overwrites an earlier one on
/// collision; anything else (array, scalar) is stored whole under the
/// source's base node id. No completed upstream yields an empty map.
pub fn merge_upstream_outputs(
    node_id: &str,
    path: Option<usize>,
    graph: &ExecutionGraph,
    run: &Run,
) -> HashMap<String, Value> {
    let mut merged = HashMap::new();
    for source in graph.journey_sources(node_id) {
        let Some(state) = resolve_entry(run, source, path) else {
            continue;
        };
        if state.status != NodeStatus::Completed {
            continue;
        }
        let Some(output) = &state.output else {
            continue;
        };
        match output {
            Value::Object(map) => {
                for (key, value) in map {
                    merged.insert(key.clone(), value.clone());
                }
            }
            other => {
                merged.insert(source.clone(), other.clone());
            }
        }
    }
    merged
}
