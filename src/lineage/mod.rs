//! Lazy lineage graph: nodes, the context-owned arena, and plan visitors.

mod graph_node;
mod lineage_graph;
mod visitor;

pub use graph_node::{GraphNode, NodeKind};
pub use lineage_graph::LineageGraph;
pub use visitor::PlanVisitor;
