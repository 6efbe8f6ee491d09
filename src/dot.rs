//! Graphviz DOT rendering of a collection's lineage.

use crate::error::Result;
use crate::function::FnRef;
use crate::lineage::{GraphNode, LineageGraph, PlanVisitor};
use crate::types::{CollectionId, GroupingOptions, OutputHandle};

/// Escapes a string for use inside a double-quoted DOT id or label.
fn escape(s: &str) -> String {
  s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Emits one DOT statement per visited node, plus its incoming edges.
struct DotWriter {
  out: String,
}

impl DotWriter {
  fn node(&mut self, node: &GraphNode, shape: &str, detail: &str) {
    self.out.push_str(&format!(
      "  n{} [label=\"{}\\n{}\", shape={}];\n",
      node.id().index(),
      escape(node.name()),
      escape(detail),
      shape
    ));
    for parent in node.parents() {
      self
        .out
        .push_str(&format!("  n{} -> n{};\n", parent.index(), node.id().index()));
    }
  }
}

impl PlanVisitor for DotWriter {
  type Output = ();

  fn visit_source(&mut self, node: &GraphNode, handle: &OutputHandle) {
    self.node(node, "cylinder", handle.uri());
  }

  fn visit_union(&mut self, node: &GraphNode) {
    self.node(node, "invtriangle", "union");
  }

  fn visit_transform(&mut self, node: &GraphNode, function: &FnRef) {
    self.node(node, "box", function.short_label());
  }

  fn visit_keyed_transform(&mut self, node: &GraphNode, function: &FnRef) {
    self.node(node, "box", function.short_label());
  }

  fn visit_grouped(&mut self, node: &GraphNode, options: &GroupingOptions) {
    let detail = match options.num_reducers {
      Some(n) => format!("group_by_key ({} reducers)", n),
      None => "group_by_key".to_string(),
    };
    self.node(node, "diamond", &detail);
  }
}

/// Renders everything needed to compute `roots` as a DOT digraph.
///
/// Materialized nodes render as sources and their upstream lineage is omitted.
pub fn render_dot(graph: &LineageGraph, roots: &[CollectionId]) -> Result<String> {
  let mut writer = DotWriter {
    out: String::from("digraph lineage {\n  rankdir=LR;\n"),
  };
  for id in graph.reachable(roots)? {
    graph.accept(id, &mut writer)?;
  }
  writer.out.push_str("}\n");
  Ok(writer.out)
}
