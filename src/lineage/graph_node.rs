//! One stage of a deferred computation.

use std::sync::Arc;

use crate::function::FnRef;
use crate::types::{CollectionId, ElementType, GroupingOptions, OutputHandle, TypeFamily};

/// The closed set of node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
  /// Already-computed input.
  Source { handle: OutputHandle },
  /// Concatenation of all parents, in parent order.
  Union,
  /// Element-wise function.
  Transform { function: FnRef },
  /// Element-wise function producing key/value pairs.
  KeyedTransform { function: FnRef },
  /// Shuffle boundary grouping key/value pairs by key.
  Grouped { options: GroupingOptions },
}

impl NodeKind {
  pub fn label(&self) -> &'static str {
    match self {
      NodeKind::Source { .. } => "source",
      NodeKind::Union => "union",
      NodeKind::Transform { .. } => "transform",
      NodeKind::KeyedTransform { .. } => "keyed_transform",
      NodeKind::Grouped { .. } => "grouped",
    }
  }

  /// Number of parents the variant requires, or `None` for any count.
  pub(crate) fn required_parents(&self) -> Option<usize> {
    match self {
      NodeKind::Source { .. } => Some(0),
      NodeKind::Union => None,
      NodeKind::Transform { .. } | NodeKind::KeyedTransform { .. } | NodeKind::Grouped { .. } => {
        Some(1)
      }
    }
  }
}

/// Immutable node stored in a [LineageGraph](super::LineageGraph).
#[derive(Debug, Clone)]
pub struct GraphNode {
  id: CollectionId,
  name: String,
  element_type: Arc<ElementType>,
  parents: Vec<CollectionId>,
  kind: NodeKind,
}

impl GraphNode {
  pub(crate) fn new(
    id: CollectionId,
    name: String,
    element_type: Arc<ElementType>,
    parents: Vec<CollectionId>,
    kind: NodeKind,
  ) -> Self {
    Self {
      id,
      name,
      element_type,
      parents,
      kind,
    }
  }

  pub fn id(&self) -> CollectionId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn element_type(&self) -> &Arc<ElementType> {
    &self.element_type
  }

  pub fn type_family(&self) -> TypeFamily {
    self.element_type.family()
  }

  pub fn parents(&self) -> &[CollectionId] {
    &self.parents
  }

  pub fn kind(&self) -> &NodeKind {
    &self.kind
  }

  /// Stand-in Source for this node once its output exists at `handle`.
  ///
  /// Keeps id, name and element type so planners can still correlate it.
  pub(crate) fn as_materialized_source(&self, handle: OutputHandle) -> GraphNode {
    GraphNode {
      id: self.id,
      name: self.name.clone(),
      element_type: Arc::clone(&self.element_type),
      parents: Vec::new(),
      kind: NodeKind::Source { handle },
    }
  }
}
