//! Tests for `PipelineConfig`.

use std::collections::HashMap;

use crate::config::{ENV_LOG_PLAN, ENV_REDUCERS, ENV_TEMP_PREFIX, PipelineConfig};
use crate::error::PipelineError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
  let map: HashMap<String, String> = pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
  move |k| map.get(k).cloned()
}

#[test]
fn defaults() {
  let c = PipelineConfig::default();
  assert_eq!(c.name, "pipeline");
  assert_eq!(c.temp_prefix, "mem://tmp");
  assert!(c.default_reducers.is_none());
  assert!(!c.log_plan);
}

#[test]
fn load_partial_json_fills_defaults() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pipeline.json");
  std::fs::write(&path, r#"{ "name": "wordcount", "default_reducers": 4 }"#).unwrap();
  let c = PipelineConfig::load(&path).unwrap();
  assert_eq!(c.name, "wordcount");
  assert_eq!(c.default_reducers, Some(4));
  assert_eq!(c.temp_prefix, "mem://tmp");
}

#[test]
fn load_roundtrips_saved_config() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pipeline.json");
  let c = PipelineConfig::default()
    .with_name("pr")
    .with_temp_prefix("mem://scratch")
    .with_default_reducers(2)
    .with_log_plan(true);
  std::fs::write(&path, serde_json::to_string_pretty(&c).unwrap()).unwrap();
  assert_eq!(PipelineConfig::load(&path).unwrap(), c);
}

#[test]
fn load_missing_file_is_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = PipelineConfig::load(&dir.path().join("nope.json"));
  assert!(matches!(r, Err(PipelineError::Io(_))));
}

#[test]
fn load_invalid_json_is_config_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("bad.json");
  std::fs::write(&path, "{ not json").unwrap();
  assert!(matches!(
    PipelineConfig::load(&path),
    Err(PipelineError::Config(_))
  ));
}

#[test]
fn overrides_apply() {
  let c = PipelineConfig::default()
    .with_overrides(env(&[
      (ENV_TEMP_PREFIX, "mem://elsewhere"),
      (ENV_REDUCERS, " 12 "),
      (ENV_LOG_PLAN, "TRUE"),
    ]))
    .unwrap();
  assert_eq!(c.temp_prefix, "mem://elsewhere");
  assert_eq!(c.default_reducers, Some(12));
  assert!(c.log_plan);
}

#[test]
fn absent_overrides_leave_config_alone() {
  let base = PipelineConfig::default().with_default_reducers(3);
  let c = base.clone().with_overrides(env(&[])).unwrap();
  assert_eq!(c, base);
}

#[test]
fn bad_reducer_override_is_rejected() {
  let r = PipelineConfig::default().with_overrides(env(&[(ENV_REDUCERS, "many")]));
  assert!(matches!(r, Err(PipelineError::Config(msg)) if msg.contains(ENV_REDUCERS)));
}

#[test]
fn bad_log_plan_override_is_rejected() {
  let r = PipelineConfig::default().with_overrides(env(&[(ENV_LOG_PLAN, "maybe")]));
  assert!(matches!(r, Err(PipelineError::Config(_))));
}
