//! Double-dispatch protocol by which planners read the graph.

use crate::function::FnRef;
use crate::types::{GroupingOptions, OutputHandle};

use super::GraphNode;

/// Walks the lineage graph one node at a time.
///
/// [LineageGraph::accept](super::LineageGraph::accept) calls exactly one of
/// these per node, chosen by the node's variant. A node that has already been
/// materialized is always presented through `visit_source`, on a transient
/// Source exposing its computed handle. Visitors that need upstream results
/// recurse by calling `accept` on the node's parents themselves.
pub trait PlanVisitor {
  type Output;

  fn visit_source(&mut self, node: &GraphNode, handle: &OutputHandle) -> Self::Output;

  fn visit_union(&mut self, node: &GraphNode) -> Self::Output;

  fn visit_transform(&mut self, node: &GraphNode, function: &FnRef) -> Self::Output;

  fn visit_keyed_transform(&mut self, node: &GraphNode, function: &FnRef) -> Self::Output;

  fn visit_grouped(&mut self, node: &GraphNode, options: &GroupingOptions) -> Self::Output;
}
