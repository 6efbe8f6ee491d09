//! Arena of graph nodes owned by a pipeline, plus its materialization records.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{PipelineError, Result};
use crate::types::{CollectionId, ElementType, OutputHandle};

use super::{GraphNode, NodeKind, PlanVisitor};

/// All nodes of one pipeline, in construction order.
///
/// Nodes are append-only and immutable. The only mutable state is the map of
/// materialization records, which goes from unset to set and never back.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
  nodes: Vec<GraphNode>,
  materialized: HashMap<CollectionId, OutputHandle>,
}

impl LineageGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn ids(&self) -> impl Iterator<Item = CollectionId> + '_ {
    self.nodes.iter().map(GraphNode::id)
  }

  /// Appends a node. Parents must already exist and match the variant's arity.
  pub(crate) fn push(
    &mut self,
    name: String,
    element_type: Arc<ElementType>,
    parents: Vec<CollectionId>,
    kind: NodeKind,
  ) -> Result<CollectionId> {
    if let Some(missing) = parents.iter().find(|p| p.index() >= self.nodes.len()) {
      return Err(PipelineError::UnknownCollection(*missing));
    }
    if let Some(n) = kind.required_parents()
      && parents.len() != n
    {
      return Err(PipelineError::InvalidGraph(format!(
        "{} node '{}' requires {} parent(s), got {}",
        kind.label(),
        name,
        n,
        parents.len()
      )));
    }
    Ok(self.insert(name, element_type, parents, kind))
  }

  /// Appends a Source node; sources have no parents to validate.
  pub(crate) fn push_source(
    &mut self,
    name: String,
    element_type: Arc<ElementType>,
    handle: OutputHandle,
  ) -> CollectionId {
    self.insert(name, element_type, Vec::new(), NodeKind::Source { handle })
  }

  fn insert(
    &mut self,
    name: String,
    element_type: Arc<ElementType>,
    parents: Vec<CollectionId>,
    kind: NodeKind,
  ) -> CollectionId {
    let id = CollectionId::new(self.nodes.len());
    debug!(node = %id, name = %name, kind = kind.label(), "node added");
    self
      .nodes
      .push(GraphNode::new(id, name, element_type, parents, kind));
    id
  }

  pub fn node(&self, id: CollectionId) -> Result<&GraphNode> {
    self
      .nodes
      .get(id.index())
      .ok_or(PipelineError::UnknownCollection(id))
  }

  pub fn parents(&self, id: CollectionId) -> Result<&[CollectionId]> {
    Ok(self.node(id)?.parents())
  }

  /// The single parent of a unary node.
  pub fn only_parent(&self, id: CollectionId) -> Result<CollectionId> {
    match self.parents(id)? {
      [parent] => Ok(*parent),
      _ => Err(PipelineError::InvalidGraph(
        "Expected exactly one parent collection".to_string(),
      )),
    }
  }

  /// `1 + max(depth(parent))`, or 1 for a node without parents.
  ///
  /// Recomputed on every call; parents never change after construction.
  pub fn depth(&self, id: CollectionId) -> Result<usize> {
    self.node(id)?;
    let reachable = self.ancestry(&[id], false);
    // Ascending ids visit parents before children.
    let mut depths: HashMap<CollectionId, usize> = HashMap::with_capacity(reachable.len());
    for node_id in reachable {
      let parent_max = self.nodes[node_id.index()]
        .parents()
        .iter()
        .map(|p| depths.get(p).copied().unwrap_or(0))
        .max()
        .unwrap_or(0);
      depths.insert(node_id, 1 + parent_max);
    }
    depths
      .get(&id)
      .copied()
      .ok_or(PipelineError::UnknownCollection(id))
  }

  pub fn materialized_at(&self, id: CollectionId) -> Option<&OutputHandle> {
    self.materialized.get(&id)
  }

  pub fn is_materialized(&self, id: CollectionId) -> bool {
    self.materialized.contains_key(&id)
  }

  /// Records that `id`'s output exists at `handle`.
  #[instrument(level = "trace", skip(self))]
  pub(crate) fn set_materialized_at(&mut self, id: CollectionId, handle: OutputHandle) -> Result<()> {
    self.node(id)?;
    debug!(node = %id, handle = %handle, "node materialized");
    self.materialized.insert(id, handle);
    Ok(())
  }

  /// Dispatches `visitor` on `id`.
  ///
  /// A materialized node is presented as a transient Source over its handle,
  /// whatever its real variant; otherwise exactly the callback for its variant
  /// is invoked.
  pub fn accept<V>(&self, id: CollectionId, visitor: &mut V) -> Result<V::Output>
  where
    V: PlanVisitor + ?Sized,
  {
    let node = self.node(id)?;
    if let Some(handle) = self.materialized.get(&id) {
      let source = node.as_materialized_source(handle.clone());
      return Ok(visitor.visit_source(&source, handle));
    }
    Ok(match node.kind() {
      NodeKind::Source { handle } => visitor.visit_source(node, handle),
      NodeKind::Union => visitor.visit_union(node),
      NodeKind::Transform { function } => visitor.visit_transform(node, function),
      NodeKind::KeyedTransform { function } => visitor.visit_keyed_transform(node, function),
      NodeKind::Grouped { options } => visitor.visit_grouped(node, options),
    })
  }

  /// Nodes a plan for `roots` has to read, in ascending (topological) order.
  ///
  /// Lineage above a materialized node is not needed and is left out.
  pub fn reachable(&self, roots: &[CollectionId]) -> Result<Vec<CollectionId>> {
    for root in roots {
      self.node(*root)?;
    }
    Ok(self.ancestry(roots, true))
  }

  fn ancestry(&self, roots: &[CollectionId], stop_at_materialized: bool) -> Vec<CollectionId> {
    let mut seen: BTreeSet<CollectionId> = BTreeSet::new();
    let mut stack: Vec<CollectionId> = roots.to_vec();
    while let Some(id) = stack.pop() {
      if !seen.insert(id) {
        continue;
      }
      if stop_at_materialized && self.is_materialized(id) {
        continue;
      }
      stack.extend(self.nodes[id.index()].parents().iter().copied());
    }
    seen.into_iter().collect()
  }
}
