//! Element type descriptors.
//!
//! The serialization side of a type lives with the execution engine; the graph
//! only carries the descriptor around, exposes its family, and lets engines
//! compare descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Serialization family an element type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
  Writable,
  Avro,
}

impl TypeFamily {
  pub fn strings(self) -> ElementType {
    ElementType::named(self, "string")
  }

  pub fn longs(self) -> ElementType {
    ElementType::named(self, "long")
  }

  pub fn floats(self) -> ElementType {
    ElementType::named(self, "float")
  }

  /// A user record type identified by `name`.
  pub fn records(self, name: impl Into<String>) -> ElementType {
    ElementType::named(self, name)
  }

  /// Key/value pairs.
  pub fn table_of(self, key: ElementType, value: ElementType) -> ElementType {
    ElementType {
      family: self,
      shape: Shape::Table(Box::new(key), Box::new(value)),
    }
  }

  /// Sequences of `element`.
  pub fn collections(self, element: ElementType) -> ElementType {
    ElementType {
      family: self,
      shape: Shape::Collection(Box::new(element)),
    }
  }
}

impl fmt::Display for TypeFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypeFamily::Writable => write!(f, "writable"),
      TypeFamily::Avro => write!(f, "avro"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shape {
  Named(String),
  Table(Box<ElementType>, Box<ElementType>),
  Collection(Box<ElementType>),
}

/// Opaque descriptor of the elements a collection holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementType {
  family: TypeFamily,
  shape: Shape,
}

impl ElementType {
  fn named(family: TypeFamily, name: impl Into<String>) -> Self {
    Self {
      family,
      shape: Shape::Named(name.into()),
    }
  }

  pub fn family(&self) -> TypeFamily {
    self.family
  }

  pub fn is_table(&self) -> bool {
    matches!(self.shape, Shape::Table(..))
  }

  pub fn key_type(&self) -> Option<&ElementType> {
    match &self.shape {
      Shape::Table(k, _) => Some(k),
      _ => None,
    }
  }

  pub fn value_type(&self) -> Option<&ElementType> {
    match &self.shape {
      Shape::Table(_, v) => Some(v),
      _ => None,
    }
  }

  /// Type produced by grouping a collection of this type by key.
  ///
  /// `table<k, v>` groups to `table<k, collection<v>>`. Non-table types have
  /// no key; they group to a collection of themselves.
  pub fn grouped(&self) -> ElementType {
    match &self.shape {
      Shape::Table(k, v) => self
        .family
        .table_of((**k).clone(), self.family.collections((**v).clone())),
      _ => self.family.collections(self.clone()),
    }
  }

  /// Fails with [PipelineError::TypeMismatch] unless `other` describes the same type.
  pub fn ensure_compatible(&self, other: &ElementType) -> Result<()> {
    if self == other {
      Ok(())
    } else {
      Err(PipelineError::TypeMismatch {
        expected: self.to_string(),
        found: other.to_string(),
      })
    }
  }

  fn fmt_shape(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.shape {
      Shape::Named(name) => write!(f, "{}", name),
      Shape::Table(k, v) => {
        write!(f, "table<")?;
        k.fmt_shape(f)?;
        write!(f, ", ")?;
        v.fmt_shape(f)?;
        write!(f, ">")
      }
      Shape::Collection(e) => {
        write!(f, "collection<")?;
        e.fmt_shape(f)?;
        write!(f, ">")
      }
    }
  }
}

impl fmt::Display for ElementType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:", self.family)?;
    self.fmt_shape(f)
  }
}
