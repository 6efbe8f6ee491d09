//! Handles to computed outputs and the targets outputs are written to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to data that already exists, as understood by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputHandle {
  uri: String,
}

impl OutputHandle {
  pub fn new(uri: impl Into<String>) -> Self {
    Self { uri: uri.into() }
  }

  pub fn uri(&self) -> &str {
    &self.uri
  }
}

impl fmt::Display for OutputHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.uri)
  }
}

/// Destination a collection can be written to.
///
/// A readable target (`source_target`) can be read back once written, so a
/// successful run marks the written collection as materialized at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
  uri: String,
  readable: bool,
}

impl Target {
  /// Write-only destination.
  pub fn sink(uri: impl Into<String>) -> Self {
    Self {
      uri: uri.into(),
      readable: false,
    }
  }

  /// Destination that can also serve as a source after it is written.
  pub fn source_target(uri: impl Into<String>) -> Self {
    Self {
      uri: uri.into(),
      readable: true,
    }
  }

  pub fn uri(&self) -> &str {
    &self.uri
  }

  pub fn is_readable(&self) -> bool {
    self.readable
  }

  /// Handle for reading this target back, if it is readable.
  pub fn as_source(&self) -> Option<OutputHandle> {
    self.readable.then(|| OutputHandle::new(self.uri.clone()))
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.uri)
  }
}
