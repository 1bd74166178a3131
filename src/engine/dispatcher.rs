//! Run dispatcher — the edge walker.
//!
//! The [`RunDispatcher`] drives a compiled graph forward: it fires entry
//! nodes when a run starts, accepts completion callbacks as the sole
//! re-entry point, and after every state change walks outbound edges to
//! dispatch newly-eligible downstream nodes. Dispatch is a single `match`
//! over the closed node-kind set so the whole state machine's control flow
//! reads in one place.
//!
//! The walk is synchronous and recursive up to the first suspension point:
//! a worker awaiting its callback or a gate awaiting a human.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dsl::schema::{EdgeKind, NodeKind};
use crate::error::{EngineError, EngineResult, NodeError};
use crate::graph::{ExecNode, ExecutionGraph};
use crate::movement::{EntityMover, MovementOutcome, NoopMover};
use crate::state::{
    ensure_valid_transition, MemoryRunStore, NodeState, NodeStatus, Run, RunStore,
};
use crate::workers::{CallbackOutcome, CallbackStatus, FireRequest, Fired, WorkUnitRegistry};

use super::dependency::{merge_upstream_outputs, upstream_dependencies_completed};
use super::paths::{augmented_id, evaluate_fan_in, split_entry_id, FanIn};

/// Config key a splitter reads its array field name from.
const SPLIT_FIELD_KEY: &str = "split_field";
const DEFAULT_SPLIT_FIELD: &str = "items";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Base of the callback URL handed to work units:
    /// `{base}/callback/{run_id}/{node_id}`.
    pub callback_base_url: String,
    /// Bound on the synchronous hand-off to a work unit. Does not bound
    /// how long a node may stay `running` awaiting its callback.
    pub firing_timeout: Duration,
    /// Whether a zero-element fan-out completes the downstream collector
    /// with an empty array (the alternative leaves it pending forever).
    pub empty_fanout_completes_collector: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            callback_base_url: "http://127.0.0.1:8080".to_string(),
            firing_timeout: Duration::from_secs(30),
            empty_fanout_completes_collector: true,
        }
    }
}

/// The execution engine for one compiled graph.
pub struct RunDispatcher {
    graph: Arc<ExecutionGraph>,
    store: Arc<dyn RunStore>,
    registry: Arc<WorkUnitRegistry>,
    mover: Arc<dyn EntityMover>,
    config: DispatcherConfig,
}

pub struct RunDispatcherBuilder {
    graph: Arc<ExecutionGraph>,
    store: Option<Arc<dyn RunStore>>,
    registry: Option<Arc<WorkUnitRegistry>>,
    mover: Option<Arc<dyn EntityMover>>,
    config: DispatcherConfig,
}

impl RunDispatcherBuilder {
    pub fn with_store(mut self, store: Arc<dyn RunStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_registry(mut self, registry: Arc<WorkUnitRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_mover(mut self, mover: Arc<dyn EntityMover>) -> Self {
        self.mover = Some(mover);
        self
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> RunDispatcher {
        RunDispatcher {
            graph: self.graph,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryRunStore::new())),
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(WorkUnitRegistry::with_http_defaults())),
            mover: self.mover.unwrap_or_else(|| Arc::new(NoopMover)),
            config: self.config,
        }
    }
}

impl RunDispatcher {
    pub fn builder(graph: Arc<ExecutionGraph>) -> RunDispatcherBuilder {
        RunDispatcherBuilder {
            graph,
            store: None,
            registry: None,
            mover: None,
            config: DispatcherConfig::default(),
        }
    }

    pub fn graph(&self) -> &ExecutionGraph {
        &self.graph
    }

    /// Live snapshot of a run.
    pub async fn get_run(&self, run_id: &str) -> EngineResult<Run> {
        self.store.get_run(run_id).await
    }

    /// Drop a run from the store.
    pub async fn delete_run(&self, run_id: &str) -> EngineResult<()> {
        self.store.delete_run(run_id).await
    }

    /// Create a run and fire every entry node.
    pub async fn start_run(&self) -> EngineResult<Run> {
        let run = self.store.create_run(&self.graph).await?;
        info!(run_id = %run.id, graph_id = %self.graph.id, "run created");
        for entry in &self.graph.entry_nodes {
            self.dispatch_target(&run.id, entry, None, true).await?;
        }
        self.store.get_run(&run.id).await
    }

    /// Apply a completion callback — the sole re-entry point for
    /// out-of-process work.
    ///
    /// Re-delivering an already-applied terminal status is a no-op; a
    /// stale or contradictory transition is rejected, not applied.
    pub async fn handle_callback(
        &self,
        run_id: &str,
        entry_id: &str,
        outcome: CallbackOutcome,
    ) -> EngineResult<Run> {
        let run = self.store.get_run(run_id).await?;
        let current = run
            .state(entry_id)
            .ok_or_else(|| EngineError::NodeNotFound {
                run_id: run_id.to_string(),
                node_id: entry_id.to_string(),
            })?;
        let to = match outcome.status {
            CallbackStatus::Completed => NodeStatus::Completed,
            CallbackStatus::Failed => NodeStatus::Failed,
        };
        if current.status == to {
            debug!(run_id, node_id = entry_id, status = %to, "duplicate callback ignored");
            return Ok(run);
        }
        ensure_valid_transition(entry_id, current.status, to)?;

        let state = match outcome.status {
            CallbackStatus::Completed => NodeState::completed(outcome.output),
            CallbackStatus::Failed => NodeState::failed(
                outcome
                    .error
                    .unwrap_or_else(|| "work unit reported failure".to_string()),
            ),
        };
        self.store
            .update_node_states(run_id, HashMap::from([(entry_id.to_string(), state)]))
            .await?;
        info!(run_id, node_id = entry_id, status = %to, "callback applied");

        self.apply_movement(run_id, entry_id, to).await;
        self.walk_edges(run_id, entry_id).await?;
        self.store.get_run(run_id).await
    }

    /// Complete a human gate with an approval payload and resume the walk.
    pub async fn resume_gate(
        &self,
        run_id: &str,
        entry_id: &str,
        output: Option<Value>,
    ) -> EngineResult<Run> {
        let run = self.store.get_run(run_id).await?;
        let current = run
            .state(entry_id)
            .ok_or_else(|| EngineError::NodeNotFound {
                run_id: run_id.to_string(),
                node_id: entry_id.to_string(),
            })?;
        if current.status == NodeStatus::Completed {
            return Ok(run);
        }
        ensure_valid_transition(entry_id, current.status, NodeStatus::Completed)?;
        let output = output.or_else(|| current.output.clone());
        self.store
            .update_node_states(
                run_id,
                HashMap::from([(entry_id.to_string(), NodeState::completed(output))]),
            )
            .await?;
        info!(run_id, node_id = entry_id, "gate resumed");
        self.walk_edges(run_id, entry_id).await?;
        self.store.get_run(run_id).await
    }

    /// Manual retry: explicit `failed -> pending` write, then re-drive the
    /// node if its dependencies still hold.
    pub async fn retry_node(&self, run_id: &str, entry_id: &str) -> EngineResult<Run> {
        let run = self.store.get_run(run_id).await?;
        let current = run
            .state(entry_id)
            .ok_or_else(|| EngineError::NodeNotFound {
                run_id: run_id.to_string(),
                node_id: entry_id.to_string(),
            })?;
        ensure_valid_transition(entry_id, current.status, NodeStatus::Pending)?;
        self.store
            .update_node_states(
                run_id,
                HashMap::from([(entry_id.to_string(), NodeState::pending())]),
            )
            .await?;
        info!(run_id, node_id = entry_id, "node reset for retry");
        let (base, path) = split_entry_id(&self.graph, entry_id);
        self.dispatch_target(run_id, base, path, true).await?;
        self.store.get_run(run_id).await
    }

    /// Walk outbound edges of the entry's base node.
    fn walk_edges<'a>(&'a self, run_id: &'a str, entry_id: &'a str) -> BoxFuture<'a, EngineResult<()>> {
        async move {
            let (base, path) = split_entry_id(&self.graph, entry_id);
            self.walk_from(run_id, base, path).await
        }
        .boxed()
    }

    fn walk_from<'a>(
        &'a self,
        run_id: &'a str,
        base: &'a str,
        path: Option<usize>,
    ) -> BoxFuture<'a, EngineResult<()>> {
        async move {
            debug!(run_id, node_id = base, ?path, "walking outbound edges");
            for edge in self.graph.outbound(base) {
                match edge.kind {
                    // Fire-and-forget side channel: no dependency check.
                    EdgeKind::System => {
                        self.dispatch_target(run_id, &edge.target, path, false).await?
                    }
                    EdgeKind::Journey => {
                        self.dispatch_target(run_id, &edge.target, path, true).await?
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Dispatch one target node if it is eligible. `gated` applies the
    /// journey dependency check; system edges skip it.
    async fn dispatch_target(
        &self,
        run_id: &str,
        target: &str,
        path: Option<usize>,
        gated: bool,
    ) -> EngineResult<()> {
        let node = self
            .graph
            .node(target)
            .ok_or_else(|| EngineError::GraphNodeNotFound(target.to_string()))?;

        // Collectors are fan-in points: re-evaluated on every walk rather
        // than instantiated per path.
        if node.kind == NodeKind::Collector {
            return self.evaluate_collector(run_id, target).await;
        }

        let run = self.store.get_run(run_id).await?;
        if gated && !upstream_dependencies_completed(target, path, &self.graph, &run) {
            debug!(run_id, node_id = target, ?path, "dependencies not satisfied yet");
            return Ok(());
        }

        let entry_id = match (node.kind, path) {
            (NodeKind::Worker | NodeKind::HumanGate, Some(index)) => augmented_id(target, index),
            _ => target.to_string(),
        };
        let status = run.status_of(&entry_id).unwrap_or(NodeStatus::Pending);
        if status != NodeStatus::Pending {
            debug!(run_id, entry_id = %entry_id, %status, "already dispatched");
            return Ok(());
        }

        match node.kind {
            NodeKind::Worker => self.fire_worker(run_id, node, &entry_id, path, &run).await,
            NodeKind::HumanGate => self.open_gate(run_id, node, &entry_id, path, &run).await,
            NodeKind::Splitter => self.fan_out(run_id, node, path, &run).await,
            // Handled above; sections/notes never reach the graph.
            NodeKind::Collector | NodeKind::Section | NodeKind::Note => Ok(()),
        }
    }

    /// Fire a worker: mark running, build the merged input, hand off.
    /// A synchronous firing failure converts to a `failed` state — the
    /// node is never left `running`, and the walk of independent branches
    /// continues.
    async fn fire_worker(
        &self,
        run_id: &str,
        node: &ExecNode,
        entry_id: &str,
        path: Option<usize>,
        run: &Run,
    ) -> EngineResult<()> {
        let input = merge_upstream_outputs(&node.id, path, &self.graph, run);
        ensure_valid_transition(
            entry_id,
            run.status_of(entry_id).unwrap_or(NodeStatus::Pending),
            NodeStatus::Running,
        )?;
        self.store
            .update_node_states(
                run_id,
                HashMap::from([(entry_id.to_string(), NodeState::running())]),
            )
            .await?;

        let fired = match self.resolve_executor(node) {
            Ok(executor) => {
                let request = FireRequest {
                    run_id: run_id.to_string(),
                    node_id: entry_id.to_string(),
                    config: node.config.clone(),
                    input,
                    callback_url: format!(
                        "{}/callback/{}/{}",
                        self.config.callback_base_url.trim_end_matches('/'),
                        run_id,
                        entry_id
                    ),
                };
                match tokio::time::timeout(self.config.firing_timeout, executor.fire(&request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(NodeError::FiringTimeout {
                        secs: self.config.firing_timeout.as_secs(),
                    }),
                }
            }
            Err(err) => Err(err),
        };

        match fired {
            Ok(Fired::Accepted) => {
                debug!(run_id, entry_id, "work unit accepted; awaiting callback");
                Ok(())
            }
            Ok(Fired::Done(outcome)) => {
                self.handle_callback(run_id, entry_id, outcome).await?;
                Ok(())
            }
            Err(err) => {
                warn!(run_id, entry_id, error = %err, "firing failed");
                self.handle_callback(
                    run_id,
                    entry_id,
                    CallbackOutcome::failed(format!("firing error: {err}")),
                )
                .await?;
                Ok(())
            }
        }
    }

    fn resolve_executor(
        &self,
        node: &ExecNode,
    ) -> Result<Arc<dyn crate::workers::WorkUnitExecutor>, NodeError> {
        let kind = node
            .config
            .get("worker")
            .and_then(|v| v.as_str())
            .ok_or_else(|| NodeError::InvalidConfig("worker kind missing".to_string()))?;
        self.registry
            .get(kind)
            .ok_or_else(|| NodeError::UnknownWorkerKind(kind.to_string()))
    }

    /// Open a human gate: park the merged input on the state so the gate's
    /// context is inspectable, and stop the walk here.
    async fn open_gate(
        &self,
        run_id: &str,
        node: &ExecNode,
        entry_id: &str,
        path: Option<usize>,
        run: &Run,
    ) -> EngineResult<()> {
        let input = merge_upstream_outputs(&node.id, path, &self.graph, run);
        ensure_valid_transition(
            entry_id,
            run.status_of(entry_id).unwrap_or(NodeStatus::Pending),
            NodeStatus::WaitingForUser,
        )?;
        let context = Value::Object(input.into_iter().collect());
        self.store
            .update_node_states(
                run_id,
                HashMap::from([(entry_id.to_string(), NodeState::waiting(Some(context)))]),
            )
            .await?;
        info!(run_id, entry_id, "gate waiting for user");
        Ok(())
    }

    /// Splitter fan-out: expand the configured array field into augmented
    /// entries, all created completed in one atomic update, then walk once
    /// per path.
    async fn fan_out(
        &self,
        run_id: &str,
        node: &ExecNode,
        path: Option<usize>,
        run: &Run,
    ) -> EngineResult<()> {
        let input = merge_upstream_outputs(&node.id, path, &self.graph, run);
        ensure_valid_transition(
            &node.id,
            run.status_of(&node.id).unwrap_or(NodeStatus::Pending),
            NodeStatus::Running,
        )?;
        self.store
            .update_node_states(
                run_id,
                HashMap::from([(node.id.clone(), NodeState::running())]),
            )
            .await?;

        let field = node
            .config
            .get(SPLIT_FIELD_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_SPLIT_FIELD);
        let items = match input.get(field) {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                let message = format!("splitter input field '{field}' is not an array");
                warn!(run_id, node_id = %node.id, error = %message, "splitter input invalid");
                self.handle_callback(run_id, &node.id, CallbackOutcome::failed(message))
                    .await?;
                return Ok(());
            }
        };

        let mut updates: HashMap<String, NodeState> = HashMap::with_capacity(items.len() + 1);
        updates.insert(
            node.id.clone(),
            NodeState::completed(Some(Value::Array(items.clone()))),
        );
        for (index, element) in items.iter().enumerate() {
            updates.insert(
                augmented_id(&node.id, index),
                NodeState::completed(Some(element.clone())),
            );
        }
        self.store.update_node_states(run_id, updates).await?;
        info!(run_id, node_id = %node.id, paths = items.len(), "fan-out complete");

        if items.is_empty() {
            if self.config.empty_fanout_completes_collector {
                self.propagate_empty_fanout(run_id, &node.id).await?;
            }
            return Ok(());
        }
        for index in 0..items.len() {
            self.walk_from(run_id, &node.id, Some(index)).await?;
        }
        Ok(())
    }

    /// Fan-in: evaluate the collector against a live snapshot. No action
    /// while siblings are still in flight; the next sibling's walk
    /// re-evaluates.
    async fn evaluate_collector(&self, run_id: &str, collector_id: &str) -> EngineResult<()> {
        let run = self.store.get_run(run_id).await?;
        let current = run
            .status_of(collector_id)
            .ok_or_else(|| EngineError::NodeNotFound {
                run_id: run_id.to_string(),
                node_id: collector_id.to_string(),
            })?;
        if current.is_terminal() {
            return Ok(());
        }
        match evaluate_fan_in(
            collector_id,
            &self.graph,
            &run,
            self.config.empty_fanout_completes_collector,
        ) {
            FanIn::Pending => Ok(()),
            FanIn::Failed(message) => {
                warn!(run_id, node_id = collector_id, error = %message, "collector failed");
                self.promote(run_id, collector_id, current, NodeState::failed(message))
                    .await?;
                self.walk_from(run_id, collector_id, None).await
            }
            FanIn::Complete(items) => {
                info!(run_id, node_id = collector_id, paths = items.len(), "collector complete");
                self.promote(
                    run_id,
                    collector_id,
                    current,
                    NodeState::completed(Some(Value::Array(items))),
                )
                .await?;
                self.walk_from(run_id, collector_id, None).await
            }
        }
    }

    /// Step an entry from `pending` through `running` into a terminal
    /// state, validating each hop.
    async fn promote(
        &self,
        run_id: &str,
        entry_id: &str,
        mut current: NodeStatus,
        target: NodeState,
    ) -> EngineResult<()> {
        if current == NodeStatus::Pending {
            ensure_valid_transition(entry_id, current, NodeStatus::Running)?;
            self.store
                .update_node_states(
                    run_id,
                    HashMap::from([(entry_id.to_string(), NodeState::running())]),
                )
                .await?;
            current = NodeStatus::Running;
        }
        ensure_valid_transition(entry_id, current, target.status)?;
        self.store
            .update_node_states(run_id, HashMap::from([(entry_id.to_string(), target)]))
            .await?;
        Ok(())
    }

    /// A zero-element fan-out dispatches nothing, so nothing downstream
    /// would ever re-evaluate the collector. Scan forward through the
    /// unfired template chain and settle the first collector on each
    /// branch; deeper collectors settle through its own walk.
    async fn propagate_empty_fanout(&self, run_id: &str, splitter_id: &str) -> EngineResult<()> {
        debug!(run_id, node_id = splitter_id, "propagating empty fan-out");
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = self
            .graph
            .outbound(splitter_id)
            .iter()
            .filter(|e| e.kind == EdgeKind::Journey)
            .map(|e| e.target.as_str())
            .collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.graph.node(id) else { continue };
            if node.kind == NodeKind::Collector {
                self.evaluate_collector(run_id, id).await?;
            } else {
                queue.extend(
                    self.graph
                        .outbound(id)
                        .iter()
                        .filter(|e| e.kind == EdgeKind::Journey)
                        .map(|e| e.target.as_str()),
                );
            }
        }
        Ok(())
    }

    /// Fire the worker's movement rule for the terminal status it reached.
    /// Movement is an external effect: failures are logged and never touch
    /// node state or block the walk.
    async fn apply_movement(&self, run_id: &str, entry_id: &str, to: NodeStatus) {
        let (base, _) = split_entry_id(&self.graph, entry_id);
        let Some(node) = self.graph.node(base) else {
            return;
        };
        if node.kind != NodeKind::Worker {
            return;
        }
        let (rule, outcome) = match to {
            NodeStatus::Completed => (node.on_success.as_ref(), MovementOutcome::Success),
            NodeStatus::Failed => (node.on_failure.as_ref(), MovementOutcome::Failure),
            _ => return,
        };
        if let Some(rule) = rule {
            if let Err(error) = self.mover.move_entity(run_id, base, rule, outcome).await {
                warn!(run_id, node_id = base, error = %error, "entity movement failed");
            }
        }
    }
}
