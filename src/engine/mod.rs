//! Execution engines: the collaborator that runs plans and reads results back.

mod memory;
#[cfg(test)]
mod memory_test;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::function::Record;
use crate::plan::ExecutionPlan;
use crate::types::OutputHandle;

pub use memory::MemoryEngine;

/// Finite stream of records read back from a computed output.
pub type RecordStream = BoxStream<'static, Result<Record>>;

/// Runs compiled plans and serves their outputs.
#[async_trait]
pub trait Engine: Send + Sync {
  /// Produces every output of `plan`. Errors are returned to the caller as-is.
  async fn execute(&self, plan: &ExecutionPlan) -> Result<()>;

  /// Opens a fresh stream over the records at `handle`.
  fn read_back(&self, handle: &OutputHandle) -> Result<RecordStream>;
}
