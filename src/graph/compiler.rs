//! Canvas compiler: authored canvas -> validated [`ExecutionGraph`].
//!
//! Compilation is all-or-nothing. Every structural check, the cycle check,
//! and the movement cross-reference check all run and collect diagnostics;
//! only a clean document produces a graph.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::dsl::schema::{
    CanvasNode, CanvasSchema, EdgeKind, MovementRule, NodeKind, COMPLETE_AS_VALUES,
    ENTITY_TYPE_VALUES,
};
use crate::error::CompileError;
use crate::workers::KNOWN_WORK_UNIT_KINDS;

use super::cycle::find_journey_cycle;
use super::types::{edge_key, ExecEdge, ExecNode, ExecutionGraph};

pub struct CanvasCompiler;

impl CanvasCompiler {
    /// Compile a canvas document, returning either a full execution graph
    /// or the full list of diagnostics.
    pub fn compile(schema: &CanvasSchema) -> Result<ExecutionGraph, Vec<CompileError>> {
        let mut errors: Vec<CompileError> = Vec::new();

        // Node table. Sections and notes exist only for presentation and
        // are dropped here; authored order is kept for deterministic
        // traversal and error reporting.
        let mut order: Vec<String> = Vec::new();
        let mut nodes: HashMap<String, ExecNode> = HashMap::new();
        let mut decorative: HashSet<&str> = HashSet::new();
        for node in &schema.nodes {
            if !node.kind.is_executable() {
                decorative.insert(node.id.as_str());
                continue;
            }
            if nodes.contains_key(&node.id) {
                errors.push(CompileError::invalid_config(
                    Some(node.id.clone()),
                    format!("duplicate node id '{}'", node.id),
                ));
                continue;
            }
            order.push(node.id.clone());
            nodes.insert(
                node.id.clone(),
                ExecNode {
                    id: node.id.clone(),
                    kind: node.kind,
                    config: node.config.clone(),
                    on_success: node.on_success.clone(),
                    on_failure: node.on_failure.clone(),
                },
            );
        }

        // Edges between execution nodes are kept in authored order. Edges
        // touching a section/note connect nothing and are dropped; edges
        // naming a node that does not exist at all are diagnostics.
        let mut kept: Vec<ExecEdge> = Vec::new();
        let mut edge_data: HashMap<String, serde_json::Value> = HashMap::new();
        for edge in &schema.edges {
            let endpoints_known = [&edge.source, &edge.target]
                .into_iter()
                .all(|id| nodes.contains_key(id) || decorative.contains(id.as_str()));
            if !endpoints_known {
                errors.push(CompileError::invalid_config(
                    None,
                    format!(
                        "edge '{}'->'{}' references an unknown node",
                        edge.source, edge.target
                    ),
                ));
                continue;
            }
            if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
                continue;
            }
            if let Some(data) = &edge.data {
                edge_data.insert(edge_key(&edge.source, &edge.target), data.clone());
            }
            kept.push(ExecEdge {
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.kind,
            });
        }

        // Worker checks run for every worker node regardless of edges, and
        // only for worker nodes.
        let authored_ids: HashSet<&str> = schema.nodes.iter().map(|n| n.id.as_str()).collect();
        for node in &schema.nodes {
            if node.kind == NodeKind::Worker {
                Self::validate_worker(node, &authored_ids, &mut errors);
            }
        }

        // Cycle check over journey-kind adjacency only.
        let ordered_ids: Vec<&str> = order.iter().map(String::as_str).collect();
        let journey_pairs: Vec<(&str, &str)> = kept
            .iter()
            .filter(|e| e.kind == EdgeKind::Journey)
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        if let Some(node_id) = find_journey_cycle(&ordered_ids, &journey_pairs) {
            errors.push(CompileError::cycle(
                node_id,
                "journey edges form a cycle",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut adjacency: HashMap<String, Vec<ExecEdge>> = HashMap::new();
        let mut inbound_edges: HashMap<String, Vec<String>> = HashMap::new();
        for id in &order {
            adjacency.insert(id.clone(), Vec::new());
            inbound_edges.insert(id.clone(), Vec::new());
        }
        for edge in &kept {
            adjacency
                .get_mut(&edge.source)
                .expect("edge endpoints are in the node table")
                .push(edge.clone());
            if edge.kind == EdgeKind::Journey {
                inbound_edges
                    .get_mut(&edge.target)
                    .expect("edge endpoints are in the node table")
                    .push(edge.source.clone());
            }
        }

        let entry_nodes: Vec<String> = order
            .iter()
            .filter(|id| inbound_edges[*id].is_empty())
            .cloned()
            .collect();
        let terminal_nodes: Vec<String> = order
            .iter()
            .filter(|id| adjacency[*id].is_empty())
            .cloned()
            .collect();

        let id = schema
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        debug!(
            graph_id = %id,
            nodes = nodes.len(),
            edges = kept.len(),
            entries = entry_nodes.len(),
            "canvas compiled"
        );

        Ok(ExecutionGraph {
            id,
            nodes,
            adjacency,
            inbound_edges,
            edge_data,
            entry_nodes,
            terminal_nodes,
        })
    }

    fn validate_worker(
        node: &CanvasNode,
        authored_ids: &HashSet<&str>,
        errors: &mut Vec<CompileError>,
    ) {
        match node.config.get("worker").and_then(|v| v.as_str()) {
            Some(kind) if KNOWN_WORK_UNIT_KINDS.contains(&kind) => {}
            Some(kind) => errors.push(CompileError::invalid_worker(
                node.id.clone(),
                format!("unknown work-unit kind '{kind}'"),
            )),
            None => errors.push(CompileError::invalid_worker(
                node.id.clone(),
                "worker node has no 'worker' kind in its config",
            )),
        }

        for rule in [&node.on_success, &node.on_failure].into_iter().flatten() {
            Self::validate_movement(node, rule, authored_ids, errors);
        }
    }

    fn validate_movement(
        node: &CanvasNode,
        rule: &MovementRule,
        authored_ids: &HashSet<&str>,
        errors: &mut Vec<CompileError>,
    ) {
        if !authored_ids.contains(rule.move_to.as_str()) {
            errors.push(CompileError::invalid_movement(
                node.id.clone(),
                format!("movement target '{}' does not exist", rule.move_to),
            ));
        }
        if !COMPLETE_AS_VALUES.contains(&rule.complete_as.as_str()) {
            errors.push(CompileError::invalid_movement(
                node.id.clone(),
                format!("complete_as value '{}' is not allowed", rule.complete_as),
            ));
        }
        if let Some(entity_type) = &rule.set_entity_type {
            if !ENTITY_TYPE_VALUES.contains(&entity_type.as_str()) {
                errors.push(CompileError::invalid_movement(
                    node.id.clone(),
                    format!("set_entity_type value '{entity_type}' is not allowed"),
                ));
            }
        }
    }
}
