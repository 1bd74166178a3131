//! Journey-edge cycle detection.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{depth_first_search, Control, DfsEvent};

/// Search the journey-only topology for a cycle.
///
/// Nodes are visited in the order given, so the verdict and the reported
/// node are stable across repeated runs on the same input. A back edge to a
/// node still on the DFS path is a cycle; self-loops count. Returns the id
/// of one node on the cycle.
pub(crate) fn find_journey_cycle(
    node_ids: &[&str],
    journey_edges: &[(&str, &str)],
) -> Option<String> {
    let mut graph = StableDiGraph::<String, ()>::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();

    for id in node_ids {
        index.insert(*id, graph.add_node((*id).to_string()));
    }
    for (source, target) in journey_edges {
        if let (Some(s), Some(t)) = (index.get(source), index.get(target)) {
            graph.add_edge(*s, *t, ());
        }
    }

    let starts: Vec<NodeIndex> = node_ids.iter().filter_map(|id| index.get(id)).copied().collect();
    depth_first_search(&graph, starts, |event| {
        if let DfsEvent::BackEdge(_, on_path) = event {
            return Control::Break(on_path);
        }
        Control::Continue
    })
    .break_value()
    .and_then(|idx| graph.node_weight(idx).cloned())
}
