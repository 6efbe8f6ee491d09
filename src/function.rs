//! User functions attached to transform nodes.
//!
//! Collections are typed at the API surface but share one arena, so each
//! function is stored as a [FnRef] that works on [Record]s.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Untyped record as it crosses the graph/engine boundary.
pub type Record = serde_json::Value;

/// Collects the outputs of one [DoFn::process] call.
#[derive(Debug)]
pub struct Emitter<T> {
  out: Vec<T>,
}

impl<T> Emitter<T> {
  pub(crate) fn new() -> Self {
    Self { out: Vec::new() }
  }

  pub fn emit(&mut self, value: T) {
    self.out.push(value);
  }

  pub(crate) fn into_inner(self) -> Vec<T> {
    self.out
  }
}

/// Element-wise function from `S` to zero or more `T`.
pub trait DoFn<S, T>: Send + Sync + 'static {
  fn process(&self, input: S, emitter: &mut Emitter<T>);
}

impl<S, T, F> DoFn<S, T> for F
where
  F: Fn(S, &mut Emitter<T>) + Send + Sync + 'static,
{
  fn process(&self, input: S, emitter: &mut Emitter<T>) {
    self(input, emitter)
  }
}

/// One-to-one function adapted to [DoFn]. Build with [map_fn].
pub struct MapFn<S, T, F> {
  f: F,
  _marker: PhantomData<fn(S) -> T>,
}

/// Wraps `f` so that every input emits exactly one output.
pub fn map_fn<S, T, F>(f: F) -> MapFn<S, T, F>
where
  F: Fn(S) -> T + Send + Sync + 'static,
{
  MapFn {
    f,
    _marker: PhantomData,
  }
}

impl<S, T, F> DoFn<S, T> for MapFn<S, T, F>
where
  S: 'static,
  T: 'static,
  F: Fn(S) -> T + Send + Sync + 'static,
{
  fn process(&self, input: S, emitter: &mut Emitter<T>) {
    emitter.emit((self.f)(input));
  }
}

type ErasedCall = dyn Fn(Record) -> Result<Vec<Record>> + Send + Sync;

/// Type-erased reference to a user function, as seen by planners and engines.
#[derive(Clone)]
pub struct FnRef {
  label: &'static str,
  call: Arc<ErasedCall>,
}

impl FnRef {
  pub(crate) fn erase<S, T, F>(f: F) -> Self
  where
    S: DeserializeOwned + 'static,
    T: Serialize + 'static,
    F: DoFn<S, T>,
  {
    let label = std::any::type_name::<F>();
    let call = move |input: Record| -> Result<Vec<Record>> {
      let input: S = serde_json::from_value(input)?;
      let mut emitter = Emitter::new();
      f.process(input, &mut emitter);
      emitter
        .into_inner()
        .into_iter()
        .map(|out| serde_json::to_value(out).map_err(Into::into))
        .collect()
    };
    Self {
      label,
      call: Arc::new(call),
    }
  }

  /// Type name of the wrapped function, for diagnostics.
  pub fn label(&self) -> &str {
    self.label
  }

  /// Last path segment of [FnRef::label], without generic arguments.
  pub fn short_label(&self) -> &str {
    let base = self.label.split('<').next().unwrap_or(self.label);
    base.rsplit("::").next().unwrap_or(base)
  }

  /// Runs the function on one record.
  pub fn apply(&self, input: Record) -> Result<Vec<Record>> {
    (self.call)(input)
  }
}

impl fmt::Debug for FnRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FnRef").field("label", &self.label).finish()
  }
}
