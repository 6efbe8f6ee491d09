//! Compile pending outputs into an [ExecutionPlan] for an engine.
//!
//! The plan carries a snapshot of the lineage graph, so the engine can walk it
//! with a [PlanVisitor] while the pipeline keeps accepting new nodes.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{PipelineError, Result};
use crate::function::FnRef;
use crate::lineage::{GraphNode, LineageGraph, PlanVisitor};
use crate::types::{CollectionId, GroupingOptions, OutputHandle, Target};

/// A collection registered to be written to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOutput {
  pub node: CollectionId,
  pub target: Target,
}

/// Counts of what a plan will touch, gathered by visiting its nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
  pub nodes: usize,
  pub sources: usize,
  pub unions: usize,
  pub transforms: usize,
  pub shuffles: usize,
  pub max_depth: usize,
}

struct StatsCollector {
  stats: PlanStats,
}

impl PlanVisitor for StatsCollector {
  type Output = ();

  fn visit_source(&mut self, _node: &GraphNode, _handle: &OutputHandle) {
    self.stats.sources += 1;
  }

  fn visit_union(&mut self, _node: &GraphNode) {
    self.stats.unions += 1;
  }

  fn visit_transform(&mut self, _node: &GraphNode, _function: &FnRef) {
    self.stats.transforms += 1;
  }

  fn visit_keyed_transform(&mut self, _node: &GraphNode, _function: &FnRef) {
    self.stats.transforms += 1;
  }

  fn visit_grouped(&mut self, _node: &GraphNode, _options: &GroupingOptions) {
    self.stats.shuffles += 1;
  }
}

/// One execution round: graph snapshot plus the outputs to produce.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
  round: u64,
  graph: LineageGraph,
  outputs: Vec<PlannedOutput>,
  default_reducers: Option<u32>,
}

impl ExecutionPlan {
  pub fn round(&self) -> u64 {
    self.round
  }

  pub fn graph(&self) -> &LineageGraph {
    &self.graph
  }

  pub fn outputs(&self) -> &[PlannedOutput] {
    &self.outputs
  }

  /// Reducer count for groupings that do not choose one.
  pub fn default_reducers(&self) -> Option<u32> {
    self.default_reducers
  }

  /// Nodes the engine has to read, in topological order.
  pub fn nodes(&self) -> Result<Vec<CollectionId>> {
    let roots: Vec<CollectionId> = self.outputs.iter().map(|o| o.node).collect();
    self.graph.reachable(&roots)
  }

  pub fn stats(&self) -> Result<PlanStats> {
    let nodes = self.nodes()?;
    let mut collector = StatsCollector {
      stats: PlanStats {
        nodes: nodes.len(),
        ..PlanStats::default()
      },
    };
    for id in nodes {
      self.graph.accept(id, &mut collector)?;
    }
    let mut stats = collector.stats;
    for output in &self.outputs {
      stats.max_depth = stats.max_depth.max(self.graph.depth(output.node)?);
    }
    Ok(stats)
  }
}

/// Builds the plan for one round from a graph snapshot and its pending outputs.
#[instrument(level = "trace", skip(graph, outputs))]
pub fn compile_plan(
  round: u64,
  graph: LineageGraph,
  outputs: Vec<PlannedOutput>,
  default_reducers: Option<u32>,
) -> Result<ExecutionPlan> {
  info!(round, "compiling execution plan");
  if outputs.is_empty() {
    return Err(PipelineError::InvalidGraph(
      "execution plan has no outputs".to_string(),
    ));
  }
  for output in &outputs {
    graph.node(output.node)?;
  }
  let plan = ExecutionPlan {
    round,
    graph,
    outputs,
    default_reducers,
  };
  let stats = plan.stats()?;
  info!(
    round,
    outputs = plan.outputs.len(),
    nodes = stats.nodes,
    shuffles = stats.shuffles,
    max_depth = stats.max_depth,
    "compilation complete"
  );
  Ok(plan)
}
