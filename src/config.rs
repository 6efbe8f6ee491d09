//! Pipeline configuration: defaults, JSON file, environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{PipelineError, Result};

/// Overrides [PipelineConfig::temp_prefix].
pub const ENV_TEMP_PREFIX: &str = "STREAMWEAVE_COLLECT_TEMP_PREFIX";
/// Overrides [PipelineConfig::default_reducers].
pub const ENV_REDUCERS: &str = "STREAMWEAVE_COLLECT_REDUCERS";
/// Overrides [PipelineConfig::log_plan] (`1`/`true` to enable).
pub const ENV_LOG_PLAN: &str = "STREAMWEAVE_COLLECT_LOG_PLAN";

/// Settings for one [Pipeline](crate::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Pipeline name, used in logs.
  pub name: String,
  /// URI prefix for temporary outputs created by `materialize`.
  pub temp_prefix: String,
  /// Reducer count for groupings that do not set one (aggregator buckets).
  pub default_reducers: Option<u32>,
  /// Log the lineage of every planned round as DOT at info level.
  pub log_plan: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      name: "pipeline".to_string(),
      temp_prefix: "mem://tmp".to_string(),
      default_reducers: None,
      log_plan: false,
    }
  }
}

impl PipelineConfig {
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.temp_prefix = prefix.into();
    self
  }

  pub fn with_default_reducers(mut self, n: u32) -> Self {
    self.default_reducers = Some(n);
    self
  }

  pub fn with_log_plan(mut self, on: bool) -> Self {
    self.log_plan = on;
    self
  }

  /// Loads a config from a JSON file; missing fields take their defaults.
  #[instrument(level = "trace", skip(path))]
  pub fn load(path: &Path) -> Result<Self> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes)
      .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
  }

  /// Defaults with `STREAMWEAVE_COLLECT_*` environment overrides applied.
  pub fn from_env() -> Result<Self> {
    Self::default().with_env_overrides()
  }

  pub fn with_env_overrides(self) -> Result<Self> {
    self.with_overrides(|key| std::env::var(key).ok())
  }

  /// Applies overrides looked up by environment variable name.
  pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    if let Some(prefix) = lookup(ENV_TEMP_PREFIX) {
      self.temp_prefix = prefix;
    }
    if let Some(raw) = lookup(ENV_REDUCERS) {
      let n = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| PipelineError::Config(format!("{}={:?}: {}", ENV_REDUCERS, raw, e)))?;
      self.default_reducers = Some(n);
    }
    if let Some(raw) = lookup(ENV_LOG_PLAN) {
      self.log_plan = match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => {
          return Err(PipelineError::Config(format!(
            "{}={:?}: expected a boolean",
            ENV_LOG_PLAN, raw
          )));
        }
      };
    }
    Ok(self)
  }
}
