//! Value types carried by graph nodes.

mod collection_id;
mod element_type;
mod grouping_options;
#[cfg(test)]
mod grouping_options_test;
mod output_handle;

pub use collection_id::CollectionId;
pub use element_type::{ElementType, TypeFamily};
pub use grouping_options::GroupingOptions;
pub use output_handle::{OutputHandle, Target};
