//! # streamweave-collect
//!
//! Lazy lineage graph for distributed batch pipelines.
//!
//! ## Architecture
//!
//! A [Pipeline] owns an append-only [LineageGraph] of immutable nodes. Calling
//! `transform`, `keyed_transform`, `group_by_key` or `union` on a
//! [Collection] only adds a node; nothing runs. When an output is requested
//! (`write` + [Pipeline::run], or [Collection::materialize]) the pipeline
//! compiles an [ExecutionPlan] over a snapshot of the graph and hands it to
//! an [Engine]. Outputs that can be read back are recorded as the node's
//! materialization, and from then on every [PlanVisitor] sees that node as a
//! plain Source.
//!
//! [MemoryEngine] evaluates plans in process and is what the `wordcount`
//! binary and the tests run on.

pub mod collection;
pub mod config;
#[cfg(test)]
mod config_test;
pub mod dot;
pub mod engine;
pub mod error;
pub mod function;
pub mod lineage;
pub mod pipeline;
pub mod plan;
#[cfg(test)]
mod plan_test;
pub mod types;

pub use collection::{Collection, Materialized};
pub use config::PipelineConfig;
pub use engine::{Engine, MemoryEngine, RecordStream};
pub use error::{PipelineError, Result};
pub use function::{DoFn, Emitter, FnRef, Record, map_fn};
pub use lineage::{GraphNode, LineageGraph, NodeKind, PlanVisitor};
pub use pipeline::{Pipeline, RunSummary};
pub use plan::{ExecutionPlan, PlanStats, PlannedOutput};
pub use types::{CollectionId, ElementType, GroupingOptions, OutputHandle, Target, TypeFamily};
