//! Typed handles to graph nodes: the user-facing lazy collection API.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::engine::Engine;
use crate::error::{PipelineError, Result};
use crate::function::{DoFn, FnRef};
use crate::lineage::{GraphNode, NodeKind};
use crate::pipeline::Pipeline;
use crate::types::{CollectionId, ElementType, GroupingOptions, OutputHandle, Target, TypeFamily};

/// Deferred collection of `T` in a [Pipeline].
///
/// Every operation only adds a node to the pipeline's lineage graph; nothing
/// runs until [Collection::materialize] or [Pipeline::run].
pub struct Collection<T> {
  pipeline: Pipeline,
  id: CollectionId,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
  fn clone(&self) -> Self {
    Self::new(self.pipeline.clone(), self.id)
  }
}

impl<T> fmt::Debug for Collection<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Collection")
      .field("id", &self.id)
      .field("name", &self.name())
      .finish()
  }
}

impl<T> fmt::Display for Collection<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl<T> Collection<T> {
  pub(crate) fn new(pipeline: Pipeline, id: CollectionId) -> Self {
    Self {
      pipeline,
      id,
      _marker: PhantomData,
    }
  }

  pub fn id(&self) -> CollectionId {
    self.id
  }

  /// The owning pipeline.
  pub fn context(&self) -> &Pipeline {
    &self.pipeline
  }

  // Ids held by a handle always exist in its own pipeline's append-only arena.
  fn read_node<R>(&self, f: impl FnOnce(&GraphNode) -> R) -> R {
    self.pipeline.with_graph(|g| match g.node(self.id) {
      Ok(node) => f(node),
      Err(e) => unreachable!("handle {} outlived its node: {}", self.id, e),
    })
  }

  pub fn name(&self) -> String {
    self.read_node(|n| n.name().to_string())
  }

  pub fn element_type(&self) -> Arc<ElementType> {
    self.read_node(|n| Arc::clone(n.element_type()))
  }

  pub fn type_family(&self) -> TypeFamily {
    self.read_node(|n| n.type_family())
  }

  pub fn parents(&self) -> Vec<CollectionId> {
    self.read_node(|n| n.parents().to_vec())
  }

  /// The single parent of a unary node; [PipelineError::InvalidGraph] otherwise.
  pub fn only_parent(&self) -> Result<CollectionId> {
    self.pipeline.only_parent(self.id)
  }

  pub fn depth(&self) -> usize {
    self.pipeline.with_graph(|g| match g.depth(self.id) {
      Ok(d) => d,
      Err(e) => unreachable!("handle {} outlived its node: {}", self.id, e),
    })
  }

  pub fn materialized_at(&self) -> Option<OutputHandle> {
    self.pipeline.materialized_at(self.id)
  }

  /// Marks this collection as already computed at `handle`.
  pub fn materialize_at(&self, handle: OutputHandle) -> Result<()> {
    self.pipeline.materialize_at(self.id, handle)
  }

  fn derive<U>(
    &self,
    name: String,
    element_type: Arc<ElementType>,
    parents: Vec<CollectionId>,
    kind: NodeKind,
  ) -> Result<Collection<U>> {
    let id = self.pipeline.add_node(name, element_type, parents, kind)?;
    Ok(Collection::new(self.pipeline.clone(), id))
  }

  fn derive_unary<U>(&self, name: String, element_type: ElementType, kind: NodeKind) -> Collection<U> {
    match self.derive(name, Arc::new(element_type), vec![self.id], kind) {
      Ok(c) => c,
      Err(e) => unreachable!("unary node over {} rejected: {}", self.id, e),
    }
  }

  /// Union of this collection and `others`, parents in call order.
  ///
  /// Operands are kept as given: a union of a union stays two layers. Element
  /// types are not compared here.
  pub fn union(&self, others: &[&Collection<T>]) -> Result<Collection<T>> {
    let mut parents = Vec::with_capacity(others.len() + 1);
    parents.push(self.id);
    for other in others {
      if !other.pipeline.same_as(&self.pipeline) {
        return Err(PipelineError::InvalidGraph(format!(
          "cannot union {} with collection {} of another pipeline",
          self.id, other.id
        )));
      }
      parents.push(other.id);
    }
    let name = self.pipeline.next_stage_name();
    self.derive(name, self.element_type(), parents, NodeKind::Union)
  }

  /// Element-wise transform under the next anonymous stage name.
  pub fn transform<U, F>(&self, f: F, element_type: ElementType) -> Collection<U>
  where
    T: DeserializeOwned + 'static,
    U: Serialize + 'static,
    F: DoFn<T, U>,
  {
    let name = self.pipeline.next_stage_name();
    self.transform_named(name, f, element_type)
  }

  pub fn transform_named<U, F>(
    &self,
    name: impl Into<String>,
    f: F,
    element_type: ElementType,
  ) -> Collection<U>
  where
    T: DeserializeOwned + 'static,
    U: Serialize + 'static,
    F: DoFn<T, U>,
  {
    let kind = NodeKind::Transform {
      function: FnRef::erase(f),
    };
    self.derive_unary(name.into(), element_type, kind)
  }

  /// Element-wise transform into key/value pairs.
  pub fn keyed_transform<K, V, F>(&self, f: F, element_type: ElementType) -> Collection<(K, V)>
  where
    T: DeserializeOwned + 'static,
    K: Serialize + 'static,
    V: Serialize + 'static,
    F: DoFn<T, (K, V)>,
  {
    let name = self.pipeline.next_stage_name();
    self.keyed_transform_named(name, f, element_type)
  }

  pub fn keyed_transform_named<K, V, F>(
    &self,
    name: impl Into<String>,
    f: F,
    element_type: ElementType,
  ) -> Collection<(K, V)>
  where
    T: DeserializeOwned + 'static,
    K: Serialize + 'static,
    V: Serialize + 'static,
    F: DoFn<T, (K, V)>,
  {
    let kind = NodeKind::KeyedTransform {
      function: FnRef::erase(f),
    };
    self.derive_unary(name.into(), element_type, kind)
  }

  /// Registers this collection to be written to `target` on the next run.
  ///
  /// Returns the same collection, so one collection can fan out to several targets.
  pub fn write(&self, target: Target) -> Self {
    self.pipeline.register_output(self.id, target);
    self.clone()
  }

  /// Runs whatever is needed and returns a restartable reader over this collection.
  pub async fn materialize(&self) -> Result<Materialized<T>>
  where
    T: DeserializeOwned + Send + 'static,
  {
    self.pipeline.materialize(self).await
  }
}

impl<K, V> Collection<(K, V)> {
  /// Shuffle boundary grouping values by key, under the next anonymous stage name.
  pub fn group_by_key(&self, options: GroupingOptions) -> Collection<(K, Vec<V>)> {
    let name = self.pipeline.next_stage_name();
    self.group_by_key_named(name, options)
  }

  pub fn group_by_key_named(
    &self,
    name: impl Into<String>,
    options: GroupingOptions,
  ) -> Collection<(K, Vec<V>)> {
    let element_type = self.element_type().grouped();
    self.derive_unary(name.into(), element_type, NodeKind::Grouped { options })
  }
}

/// Restartable reader over a computed collection.
///
/// Each call to [Materialized::stream] asks the engine for a fresh pass over
/// the same output; nothing is re-executed.
pub struct Materialized<T> {
  engine: Arc<dyn Engine>,
  handle: OutputHandle,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Materialized<T>
where
  T: DeserializeOwned + Send + 'static,
{
  pub(crate) fn new(engine: Arc<dyn Engine>, handle: OutputHandle) -> Self {
    Self {
      engine,
      handle,
      _marker: PhantomData,
    }
  }

  pub fn handle(&self) -> &OutputHandle {
    &self.handle
  }

  /// Lazily decodes the output, one record at a time.
  pub fn stream(&self) -> Result<BoxStream<'static, Result<T>>> {
    let records = self.engine.read_back(&self.handle)?;
    Ok(
      records
        .map(|r| r.and_then(|v| serde_json::from_value(v).map_err(PipelineError::from)))
        .boxed(),
    )
  }

  /// Reads the whole output into memory.
  pub async fn collect(&self) -> Result<Vec<T>> {
    self.stream()?.try_collect().await
  }
}

impl<T> fmt::Debug for Materialized<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Materialized")
      .field("handle", &self.handle)
      .finish()
  }
}
