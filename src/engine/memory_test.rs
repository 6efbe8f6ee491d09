use futures::StreamExt;
use serde_json::json;

use crate::Collection;
use crate::engine::{Engine, MemoryEngine};
use crate::error::PipelineError;
use crate::function::{Emitter, map_fn};
use crate::pipeline::Pipeline;
use crate::plan::{PlannedOutput, compile_plan};
use crate::types::{CollectionId, GroupingOptions, OutputHandle, Target, TypeFamily};

const F: TypeFamily = TypeFamily::Writable;

fn plan_for(p: &Pipeline, outputs: &[(CollectionId, &str)]) -> crate::plan::ExecutionPlan {
  let outputs = outputs
    .iter()
    .map(|(node, uri)| PlannedOutput {
      node: *node,
      target: Target::sink(*uri),
    })
    .collect();
  compile_plan(1, p.graph(), outputs, None).unwrap()
}

#[test]
fn register_source_stores_serialized_records() {
  let engine = MemoryEngine::new();
  let handle = engine.register_source("mem://nums", [1u64, 2, 3]).unwrap();
  assert_eq!(handle.uri(), "mem://nums");
  assert_eq!(engine.contents("mem://nums").unwrap(), vec![json!(1), json!(2), json!(3)]);
  assert!(engine.contents("mem://other").is_none());
}

#[tokio::test]
async fn read_back_is_restartable() {
  let engine = MemoryEngine::new();
  let handle = engine.register_source("mem://s", ["a", "b"]).unwrap();
  let first: Vec<_> = engine.read_back(&handle).unwrap().collect().await;
  let second: Vec<_> = engine.read_back(&handle).unwrap().collect().await;
  assert_eq!(first.len(), 2);
  assert_eq!(second.len(), 2);
  assert_eq!(first[0].as_ref().unwrap(), &json!("a"));
  assert_eq!(second[1].as_ref().unwrap(), &json!("b"));
}

#[test]
fn read_back_missing_handle_fails() {
  let engine = MemoryEngine::new();
  let result = engine.read_back(&OutputHandle::new("mem://missing"));
  assert!(matches!(result, Err(PipelineError::ReadBack(_))));
}

#[tokio::test]
async fn execute_evaluates_transforms_and_unions() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let a: Collection<String> = p.read(engine.register_source("mem://a", ["x y"]).unwrap(), F.strings());
  let b: Collection<String> = p.read(engine.register_source("mem://b", ["z"]).unwrap(), F.strings());
  let split = a.transform(
    |line: String, e: &mut Emitter<String>| {
      for w in line.split(' ') {
        e.emit(w.to_string());
      }
    },
    F.strings(),
  );
  let u = split.union(&[&b]).unwrap();
  engine.execute(&plan_for(&p, &[(u.id(), "mem://out")])).await.unwrap();
  assert_eq!(
    engine.contents("mem://out").unwrap(),
    vec![json!("x"), json!("y"), json!("z")]
  );
  assert_eq!(engine.executions(), 1);
}

#[tokio::test]
async fn grouping_keeps_first_seen_key_order() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let words: Collection<String> = p.read(
    engine.register_source("mem://w", ["b", "a", "b", "c", "a"]).unwrap(),
    F.strings(),
  );
  let grouped = words
    .keyed_transform(map_fn(|w: String| (w, 1u64)), F.table_of(F.strings(), F.longs()))
    .group_by_key(GroupingOptions::new());
  engine
    .execute(&plan_for(&p, &[(grouped.id(), "mem://g")]))
    .await
    .unwrap();
  assert_eq!(
    engine.contents("mem://g").unwrap(),
    vec![json!(["b", [1, 1]]), json!(["a", [1, 1]]), json!(["c", [1]])]
  );
}

#[tokio::test]
async fn shared_upstream_is_evaluated_once_per_round() {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let nums: Collection<u64> = p.read(engine.register_source("mem://n", [1u64, 2]).unwrap(), F.longs());
  let doubled = nums.transform(
    map_fn(move |n: u64| {
      counter.fetch_add(1, Ordering::SeqCst);
      n * 2
    }),
    F.longs(),
  );
  let u = doubled.union(&[&doubled]).unwrap();
  engine
    .execute(&plan_for(&p, &[(u.id(), "mem://u"), (doubled.id(), "mem://d")]))
    .await
    .unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(engine.contents("mem://u").unwrap().len(), 4);
}

#[tokio::test]
async fn union_of_mismatched_types_fails() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let a: Collection<String> = p.read(engine.register_source("mem://a", ["x"]).unwrap(), F.strings());
  let b: Collection<String> = p.read(
    engine.register_source("mem://b", ["y"]).unwrap(),
    TypeFamily::Avro.strings(),
  );
  let u = a.union(&[&b]).unwrap();
  let err = engine
    .execute(&plan_for(&p, &[(u.id(), "mem://out")]))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::TypeMismatch { .. }));
}

#[tokio::test]
async fn grouping_non_pairs_fails() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let raw: Collection<(String, u64)> = p.read(
    engine.register_source("mem://raw", ["not a pair"]).unwrap(),
    F.table_of(F.strings(), F.longs()),
  );
  let grouped = raw.group_by_key(GroupingOptions::new());
  let err = engine
    .execute(&plan_for(&p, &[(grouped.id(), "mem://g")]))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::Execution(ref m) if m.contains("key/value pair")));
}

#[tokio::test]
async fn failed_round_writes_nothing() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let good: Collection<String> = p.read(engine.register_source("mem://good", ["x"]).unwrap(), F.strings());
  let missing: Collection<String> = p.read(OutputHandle::new("mem://missing"), F.strings());
  let err = engine
    .execute(&plan_for(
      &p,
      &[(good.id(), "mem://out/good"), (missing.id(), "mem://out/missing")],
    ))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::Execution(ref m) if m.contains("mem://missing")));
  assert!(engine.contents("mem://out/good").is_none());
  assert_eq!(engine.executions(), 0);
}

#[tokio::test]
async fn function_decode_errors_surface_as_codec_errors() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let nums: Collection<u64> = p.read(engine.register_source("mem://n", ["seven"]).unwrap(), F.longs());
  let doubled = nums.transform(map_fn(|n: u64| n * 2), F.longs());
  let err = engine
    .execute(&plan_for(&p, &[(doubled.id(), "mem://d")]))
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::Codec(_)));
}

#[tokio::test]
async fn long_chains_evaluate_without_recursion() {
  let engine = MemoryEngine::new();
  let p = Pipeline::new(engine.clone());
  let mut current: Collection<u64> =
    p.read(engine.register_source("mem://n", [1u64]).unwrap(), F.longs());
  for _ in 0..10_000 {
    current = current.transform(map_fn(|n: u64| n + 1), F.longs());
  }
  assert_eq!(current.depth(), 10_001);
  let out = current.materialize().await.unwrap().collect().await.unwrap();
  assert_eq!(out, vec![10_001]);
}
