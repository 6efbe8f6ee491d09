use crate::Collection;
use crate::engine::MemoryEngine;
use crate::error::PipelineError;
use crate::function::map_fn;
use crate::pipeline::Pipeline;
use crate::plan::{PlanStats, PlannedOutput, compile_plan};
use crate::types::{CollectionId, GroupingOptions, OutputHandle, Target, TypeFamily};

const F: TypeFamily = TypeFamily::Writable;

struct Fixture {
  pipeline: Pipeline,
  source: CollectionId,
  pairs: CollectionId,
  grouped: CollectionId,
  merged: CollectionId,
}

fn fixture() -> Fixture {
  let p = Pipeline::new(MemoryEngine::new());
  let a: Collection<String> = p.read(OutputHandle::new("mem://a"), F.strings());
  let b: Collection<String> = p.read(OutputHandle::new("mem://b"), F.strings());
  let merged = a.union(&[&b]).unwrap();
  let pairs = merged.keyed_transform(
    map_fn(|s: String| (s, 1u64)),
    F.table_of(F.strings(), F.longs()),
  );
  let grouped = pairs.group_by_key(GroupingOptions::new());
  Fixture {
    source: a.id(),
    pairs: pairs.id(),
    grouped: grouped.id(),
    merged: merged.id(),
    pipeline: p,
  }
}

fn output(node: CollectionId, uri: &str) -> PlannedOutput {
  PlannedOutput {
    node,
    target: Target::sink(uri),
  }
}

#[test]
fn empty_outputs_are_rejected() {
  let fx = fixture();
  let err = compile_plan(1, fx.pipeline.graph(), Vec::new(), None).unwrap_err();
  assert!(matches!(err, PipelineError::InvalidGraph(_)));
}

#[test]
fn unknown_output_node_is_rejected() {
  let fx = fixture();
  let err = compile_plan(
    1,
    fx.pipeline.graph(),
    vec![output(CollectionId::new(99), "mem://x")],
    None,
  )
  .unwrap_err();
  assert!(matches!(err, PipelineError::UnknownCollection(id) if id.index() == 99));
}

#[test]
fn plan_exposes_round_outputs_and_reducers() {
  let fx = fixture();
  let plan = compile_plan(
    3,
    fx.pipeline.graph(),
    vec![output(fx.grouped, "mem://out")],
    Some(8),
  )
  .unwrap();
  assert_eq!(plan.round(), 3);
  assert_eq!(plan.outputs().len(), 1);
  assert_eq!(plan.default_reducers(), Some(8));
  assert_eq!(plan.graph().len(), 5);
}

#[test]
fn stats_count_every_reachable_variant() {
  let fx = fixture();
  let plan = compile_plan(1, fx.pipeline.graph(), vec![output(fx.grouped, "mem://out")], None).unwrap();
  assert_eq!(
    plan.stats().unwrap(),
    PlanStats {
      nodes: 5,
      sources: 2,
      unions: 1,
      transforms: 1,
      shuffles: 1,
      max_depth: 4,
    }
  );
}

#[test]
fn nodes_are_topological_and_deduplicated() {
  let fx = fixture();
  let plan = compile_plan(
    1,
    fx.pipeline.graph(),
    vec![output(fx.grouped, "mem://g"), output(fx.pairs, "mem://p")],
    None,
  )
  .unwrap();
  let nodes = plan.nodes().unwrap();
  assert_eq!(nodes.len(), 5);
  assert!(nodes.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn materialized_nodes_cut_the_plan() {
  let fx = fixture();
  fx.pipeline
    .materialize_at(fx.merged, OutputHandle::new("mem://merged"))
    .unwrap();
  let plan = compile_plan(1, fx.pipeline.graph(), vec![output(fx.grouped, "mem://out")], None).unwrap();
  assert_eq!(plan.nodes().unwrap(), vec![fx.merged, fx.pairs, fx.grouped]);
  let stats = plan.stats().unwrap();
  assert_eq!(stats.nodes, 3);
  // The union is read back as a source.
  assert_eq!(stats.sources, 1);
  assert_eq!(stats.unions, 0);
}

#[test]
fn plan_is_a_snapshot() {
  let fx = fixture();
  let plan = compile_plan(1, fx.pipeline.graph(), vec![output(fx.source, "mem://out")], None).unwrap();
  let _late: Collection<String> = fx.pipeline.read(OutputHandle::new("mem://late"), F.strings());
  assert_eq!(plan.graph().len(), 5);
  assert_eq!(fx.pipeline.graph().len(), 6);
}
