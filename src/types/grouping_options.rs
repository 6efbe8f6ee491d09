//! Grouping configuration carried by shuffle boundaries.

use serde::{Deserialize, Serialize};

/// Options for a group-by-key shuffle.
///
/// The graph carries these for the planner and engine; it does not interpret them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingOptions {
  /// Number of reduce partitions; `None` defers to the pipeline default.
  pub num_reducers: Option<u32>,
  /// Name of a partitioner known to the engine.
  pub partitioner: Option<String>,
}

impl GroupingOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_num_reducers(mut self, n: u32) -> Self {
    self.num_reducers = Some(n);
    self
  }

  pub fn with_partitioner(mut self, name: impl Into<String>) -> Self {
    self.partitioner = Some(name.into());
    self
  }

  /// Reducer count to use, falling back to `default` when unset.
  pub fn effective_reducers(&self, default: Option<u32>) -> u32 {
    self.num_reducers.or(default).unwrap_or(1).max(1)
  }
}
