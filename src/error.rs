//! Error type shared by graph construction, planning and execution.

use thiserror::Error;

use crate::types::CollectionId;

/// Errors raised while building, planning or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
  /// A structural invariant of the lineage graph does not hold.
  #[error("Invalid graph: {0}")]
  InvalidGraph(String),
  /// The id does not name a node of this graph.
  #[error("Unknown collection {0}")]
  UnknownCollection(CollectionId),
  /// Two element types that must agree do not.
  #[error("Type mismatch: expected {expected}, found {found}")]
  TypeMismatch { expected: String, found: String },
  /// The engine failed to run a plan.
  #[error("Execution failed: {0}")]
  Execution(String),
  /// The engine could not read back a computed output.
  #[error("Read back failed: {0}")]
  ReadBack(String),
  /// A record could not be converted to or from its element type.
  #[error("Record codec error: {0}")]
  Codec(#[from] serde_json::Error),
  /// Configuration could not be loaded or parsed.
  #[error("Configuration error: {0}")]
  Config(String),
  /// Reading a file failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl PipelineError {
  /// Returns true for errors that originate in the execution engine.
  pub fn is_engine_failure(&self) -> bool {
    matches!(self, PipelineError::Execution(_) | PipelineError::ReadBack(_))
  }
}

/// Result alias used throughout the crate.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
