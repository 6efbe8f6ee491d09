//! Single-process engine that evaluates plans in memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use crate::error::{PipelineError, Result};
use crate::function::{FnRef, Record};
use crate::lineage::{GraphNode, LineageGraph, PlanVisitor};
use crate::plan::ExecutionPlan;
use crate::types::{CollectionId, GroupingOptions, OutputHandle};

use super::{Engine, RecordStream};

type Dataset = Arc<Vec<Record>>;

/// Engine that keeps every dataset in memory, keyed by URI.
///
/// Clones share the same store, so tests and callers can keep a handle after
/// passing one to a [Pipeline](crate::Pipeline).
#[derive(Clone, Default)]
pub struct MemoryEngine {
  store: Arc<Mutex<HashMap<String, Dataset>>>,
  executions: Arc<AtomicU64>,
}

impl MemoryEngine {
  pub fn new() -> Self {
    Self::default()
  }

  fn store(&self) -> MutexGuard<'_, HashMap<String, Dataset>> {
    self.store.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Stores `records` at `uri` and returns a handle for reading them as a source.
  pub fn register_source<T, I>(&self, uri: impl Into<String>, records: I) -> Result<OutputHandle>
  where
    T: Serialize,
    I: IntoIterator<Item = T>,
  {
    let uri = uri.into();
    let data = records
      .into_iter()
      .map(|r| serde_json::to_value(r).map_err(PipelineError::from))
      .collect::<Result<Vec<Record>>>()?;
    debug!(uri = %uri, records = data.len(), "source registered");
    self.store().insert(uri.clone(), Arc::new(data));
    Ok(OutputHandle::new(uri))
  }

  /// Records currently stored at `uri`.
  pub fn contents(&self, uri: &str) -> Option<Vec<Record>> {
    self.store().get(uri).map(|d| d.as_ref().clone())
  }

  /// Number of plans executed successfully.
  pub fn executions(&self) -> u64 {
    self.executions.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Engine for MemoryEngine {
  #[instrument(level = "trace", skip(self, plan), fields(round = plan.round()))]
  async fn execute(&self, plan: &ExecutionPlan) -> Result<()> {
    let sources = self.store().clone();
    let mut evaluator = Evaluator {
      graph: plan.graph(),
      sources: &sources,
      default_reducers: plan.default_reducers(),
      results: HashMap::new(),
    };
    // Ascending ids put every parent ahead of its children.
    for id in plan.nodes()? {
      let data = plan.graph().accept(id, &mut evaluator)??;
      evaluator.results.insert(id, data);
    }
    let mut written = Vec::with_capacity(plan.outputs().len());
    for output in plan.outputs() {
      let data = evaluator.result(output.node)?;
      written.push((output.target.uri().to_string(), data));
    }
    // Outputs become visible only once the whole round has succeeded.
    let mut store = self.store();
    for (uri, data) in written {
      info!(uri = %uri, records = data.len(), "output written");
      store.insert(uri, data);
    }
    self.executions.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn read_back(&self, handle: &OutputHandle) -> Result<RecordStream> {
    let data = self
      .store()
      .get(handle.uri())
      .cloned()
      .ok_or_else(|| PipelineError::ReadBack(format!("no data at {}", handle)))?;
    Ok(stream::iter((0..data.len()).map(move |i| Ok(data[i].clone()))).boxed())
  }
}

/// Computes node outputs by visiting the plan's nodes in topological order,
/// once per node per round.
struct Evaluator<'a> {
  graph: &'a LineageGraph,
  sources: &'a HashMap<String, Dataset>,
  default_reducers: Option<u32>,
  results: HashMap<CollectionId, Dataset>,
}

impl Evaluator<'_> {
  fn result(&self, id: CollectionId) -> Result<Dataset> {
    self
      .results
      .get(&id)
      .cloned()
      .ok_or_else(|| PipelineError::Execution(format!("node {} was not evaluated", id)))
  }

  fn apply_each(&self, node: &GraphNode, function: &FnRef) -> Result<Dataset> {
    let input = self.result(self.graph.only_parent(node.id())?)?;
    let mut out = Vec::with_capacity(input.len());
    for record in input.iter() {
      out.extend(function.apply(record.clone())?);
    }
    trace!(node = %node.name(), records_in = input.len(), records_out = out.len(), "applied");
    Ok(Arc::new(out))
  }
}

impl PlanVisitor for Evaluator<'_> {
  type Output = Result<Dataset>;

  fn visit_source(&mut self, node: &GraphNode, handle: &OutputHandle) -> Result<Dataset> {
    self
      .sources
      .get(handle.uri())
      .cloned()
      .ok_or_else(|| {
        PipelineError::Execution(format!("source '{}' has no data at {}", node.name(), handle))
      })
  }

  fn visit_union(&mut self, node: &GraphNode) -> Result<Dataset> {
    let mut out = Vec::new();
    for parent in node.parents() {
      node
        .element_type()
        .ensure_compatible(self.graph.node(*parent)?.element_type())?;
      out.extend(self.result(*parent)?.iter().cloned());
    }
    Ok(Arc::new(out))
  }

  fn visit_transform(&mut self, node: &GraphNode, function: &FnRef) -> Result<Dataset> {
    self.apply_each(node, function)
  }

  fn visit_keyed_transform(&mut self, node: &GraphNode, function: &FnRef) -> Result<Dataset> {
    self.apply_each(node, function)
  }

  fn visit_grouped(&mut self, node: &GraphNode, options: &GroupingOptions) -> Result<Dataset> {
    let input = self.result(self.graph.only_parent(node.id())?)?;
    debug!(
      node = %node.name(),
      reducers = options.effective_reducers(self.default_reducers),
      "grouping by key"
    );
    // Keys in first-seen order, values in arrival order.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    for record in input.iter() {
      let (key, value) = match record {
        Value::Array(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
        other => {
          return Err(PipelineError::Execution(format!(
            "grouped node '{}' expected a key/value pair, got {}",
            node.name(),
            other
          )));
        }
      };
      let slot = *index.entry(key.to_string()).or_insert_with(|| {
        groups.push((key.clone(), Vec::new()));
        groups.len() - 1
      });
      groups[slot].1.push(value.clone());
    }
    Ok(Arc::new(
      groups
        .into_iter()
        .map(|(k, vs)| Value::Array(vec![k, Value::Array(vs)]))
        .collect(),
    ))
  }
}
