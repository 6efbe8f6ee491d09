//! The pipeline context: owns the lineage graph, names stages, tracks pending
//! outputs, and drives execution rounds through an [Engine].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::collection::{Collection, Materialized};
use crate::config::PipelineConfig;
use crate::dot::render_dot;
use crate::engine::Engine;
use crate::error::{PipelineError, Result};
use crate::lineage::{LineageGraph, NodeKind};
use crate::plan::{PlannedOutput, compile_plan};
use crate::types::{CollectionId, ElementType, OutputHandle, Target};

#[derive(Default)]
struct PipelineState {
  graph: LineageGraph,
  pending: Vec<PlannedOutput>,
  next_stage_id: u64,
  next_temp_id: u64,
  rounds: u64,
}

struct Shared {
  config: PipelineConfig,
  engine: Arc<dyn Engine>,
  state: Mutex<PipelineState>,
  // Held for a whole round, across the engine call; rounds never overlap.
  round: tokio::sync::Mutex<()>,
}

/// Outcome of one [Pipeline::run].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  /// Execution round number; 0 when nothing was pending.
  pub round: u64,
  /// Outputs written by this round.
  pub outputs: usize,
  /// Nodes newly marked materialized.
  pub materialized: usize,
}

/// Handle to a pipeline context. Clones share the same graph.
///
/// Building the graph is synchronous and is meant to happen from one logical
/// builder. `run` and `materialize` are the only operations that wait on the
/// engine. Rounds run one at a time; the graph stays open for construction
/// while a round is in flight.
#[derive(Clone)]
pub struct Pipeline {
  shared: Arc<Shared>,
}

impl Pipeline {
  pub fn new(engine: impl Engine + 'static) -> Self {
    Self::with_config(engine, PipelineConfig::default())
  }

  pub fn with_config(engine: impl Engine + 'static, config: PipelineConfig) -> Self {
    info!(pipeline = %config.name, "pipeline created");
    Self {
      shared: Arc::new(Shared {
        config,
        engine: Arc::new(engine),
        state: Mutex::new(PipelineState::default()),
        round: tokio::sync::Mutex::new(()),
      }),
    }
  }

  fn state(&self) -> MutexGuard<'_, PipelineState> {
    self
      .shared
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  pub fn name(&self) -> &str {
    &self.shared.config.name
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.shared.config
  }

  /// True if both handles refer to the same context.
  pub fn same_as(&self, other: &Pipeline) -> bool {
    Arc::ptr_eq(&self.shared, &other.shared)
  }

  /// Next anonymous stage id: strictly increasing, shared by every node kind.
  pub fn next_anonymous_stage_id(&self) -> u64 {
    let mut state = self.state();
    let id = state.next_stage_id;
    state.next_stage_id += 1;
    id
  }

  pub(crate) fn next_stage_name(&self) -> String {
    format!("S{}", self.next_anonymous_stage_id())
  }

  /// Source collection over already-computed data, named after its handle.
  pub fn read<T>(&self, handle: OutputHandle, element_type: ElementType) -> Collection<T> {
    let name = handle.uri().to_string();
    self.read_named(name, handle, element_type)
  }

  pub fn read_named<T>(
    &self,
    name: impl Into<String>,
    handle: OutputHandle,
    element_type: ElementType,
  ) -> Collection<T> {
    let id = self
      .state()
      .graph
      .push_source(name.into(), Arc::new(element_type), handle);
    Collection::new(self.clone(), id)
  }

  pub(crate) fn add_node(
    &self,
    name: String,
    element_type: Arc<ElementType>,
    parents: Vec<CollectionId>,
    kind: NodeKind,
  ) -> Result<CollectionId> {
    self.state().graph.push(name, element_type, parents, kind)
  }

  /// Runs `f` against the current graph under the context lock.
  pub(crate) fn with_graph<R>(&self, f: impl FnOnce(&LineageGraph) -> R) -> R {
    f(&self.state().graph)
  }

  /// Snapshot of the lineage graph.
  pub fn graph(&self) -> LineageGraph {
    self.state().graph.clone()
  }

  pub fn pending_outputs(&self) -> Vec<PlannedOutput> {
    self.state().pending.clone()
  }

  /// Number of execution rounds that have completed.
  pub fn rounds(&self) -> u64 {
    self.state().rounds
  }

  /// Registers `node` to be written to `target` by the next run. No I/O happens here.
  #[instrument(level = "trace", skip(self))]
  pub(crate) fn register_output(&self, node: CollectionId, target: Target) {
    debug!(node = %node, target = %target, "output registered");
    self.state().pending.push(PlannedOutput { node, target });
  }

  pub fn materialized_at(&self, id: CollectionId) -> Option<OutputHandle> {
    self.state().graph.materialized_at(id).cloned()
  }

  /// Marks `id` as already computed at `handle`.
  pub fn materialize_at(&self, id: CollectionId, handle: OutputHandle) -> Result<()> {
    self.state().graph.set_materialized_at(id, handle)
  }

  pub fn depth(&self, id: CollectionId) -> Result<usize> {
    self.state().graph.depth(id)
  }

  pub fn parents(&self, id: CollectionId) -> Result<Vec<CollectionId>> {
    Ok(self.state().graph.parents(id)?.to_vec())
  }

  pub fn only_parent(&self, id: CollectionId) -> Result<CollectionId> {
    self.state().graph.only_parent(id)
  }

  /// DOT rendering of everything a plan for `roots` would read.
  pub fn lineage_dot(&self, roots: &[CollectionId]) -> Result<String> {
    render_dot(&self.state().graph, roots)
  }

  /// Executes every pending output in one round.
  ///
  /// On success, nodes written to readable targets are marked materialized
  /// there and the round's outputs leave the pending list. On failure the
  /// engine's error is returned unchanged and nothing is marked.
  ///
  /// A run that starts while another round is executing waits for it, then
  /// plans whatever is still pending.
  #[instrument(level = "trace", skip(self), fields(pipeline = %self.name()))]
  pub async fn run(&self) -> Result<RunSummary> {
    let _round = self.shared.round.lock().await;
    let plan = {
      let state = self.state();
      if state.pending.is_empty() {
        debug!("nothing pending");
        return Ok(RunSummary {
          round: 0,
          outputs: 0,
          materialized: 0,
        });
      }
      compile_plan(
        state.rounds + 1,
        state.graph.clone(),
        state.pending.clone(),
        self.shared.config.default_reducers,
      )?
    };
    if self.shared.config.log_plan {
      let roots: Vec<CollectionId> = plan.outputs().iter().map(|o| o.node).collect();
      info!(round = plan.round(), dot = %render_dot(plan.graph(), &roots)?, "plan lineage");
    }

    info!(round = plan.round(), outputs = plan.outputs().len(), "executing round");
    self.shared.engine.execute(&plan).await?;

    let mut state = self.state();
    // Outputs registered during the round stay pending for the next one.
    for output in plan.outputs() {
      if let Some(pos) = state.pending.iter().position(|o| o == output) {
        state.pending.remove(pos);
      }
    }
    let mut materialized = 0;
    for output in plan.outputs() {
      if let Some(handle) = output.target.as_source() {
        state.graph.set_materialized_at(output.node, handle)?;
        materialized += 1;
      }
    }
    state.rounds = plan.round();
    let done = plan.outputs().len();
    info!(round = plan.round(), outputs = done, materialized, "round complete");
    Ok(RunSummary {
      round: plan.round(),
      outputs: done,
      materialized,
    })
  }

  /// Computes `collection` if needed and returns a restartable reader over it.
  ///
  /// A collection that is already materialized is read back without running
  /// anything. Otherwise it is written to a temporary target and all pending
  /// outputs run in the same round.
  pub async fn materialize<T>(&self, collection: &Collection<T>) -> Result<Materialized<T>>
  where
    T: DeserializeOwned + Send + 'static,
  {
    if !self.same_as(collection.context()) {
      return Err(PipelineError::InvalidGraph(format!(
        "collection {} belongs to a different pipeline",
        collection.id()
      )));
    }
    let id = collection.id();
    if let Some(handle) = self.materialized_at(id) {
      debug!(node = %id, handle = %handle, "already materialized");
      return Ok(Materialized::new(Arc::clone(&self.shared.engine), handle));
    }
    {
      let mut state = self.state();
      // A readable output already queued for this node will materialize it.
      let queued = state
        .pending
        .iter()
        .any(|o| o.node == id && o.target.is_readable());
      if !queued {
        let n = state.next_temp_id;
        state.next_temp_id += 1;
        let target = Target::source_target(format!("{}/p{}", self.shared.config.temp_prefix, n));
        debug!(node = %id, target = %target, "temporary output registered");
        state.pending.push(PlannedOutput { node: id, target });
      }
    }
    self.run().await?;
    let handle = self.materialized_at(id).ok_or_else(|| {
      PipelineError::Execution(format!("collection {} was not materialized by its round", id))
    })?;
    Ok(Materialized::new(Arc::clone(&self.shared.engine), handle))
  }
}

impl fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state();
    f.debug_struct("Pipeline")
      .field("name", &self.shared.config.name)
      .field("nodes", &state.graph.len())
      .field("pending", &state.pending.len())
      .field("rounds", &state.rounds)
      .finish()
  }
}
