//! Identity of a node in a pipeline's lineage graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena index of a node in a [LineageGraph](crate::lineage::LineageGraph).
///
/// Ids are handed out in construction order, so a node's parents always
/// carry smaller ids than the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(usize);

impl CollectionId {
  pub fn new(index: usize) -> Self {
    Self(index)
  }

  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for CollectionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}
