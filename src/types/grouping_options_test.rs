//! Tests for `GroupingOptions`.

use super::GroupingOptions;

#[test]
fn default_has_no_reducers_or_partitioner() {
  let o = GroupingOptions::new();
  assert!(o.num_reducers.is_none());
  assert!(o.partitioner.is_none());
}

#[test]
fn effective_reducers_prefers_explicit_value() {
  let o = GroupingOptions::new().with_num_reducers(8);
  assert_eq!(o.effective_reducers(Some(3)), 8);
}

#[test]
fn effective_reducers_falls_back_to_default_then_one() {
  assert_eq!(GroupingOptions::new().effective_reducers(Some(3)), 3);
  assert_eq!(GroupingOptions::new().effective_reducers(None), 1);
  assert_eq!(GroupingOptions::new().with_num_reducers(0).effective_reducers(None), 1);
}

#[test]
fn partitioner_is_kept() {
  let o = GroupingOptions::new().with_partitioner("hash");
  assert_eq!(o.partitioner.as_deref(), Some("hash"));
}
