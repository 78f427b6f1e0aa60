// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::consts::{CONFIG_SCHEMA_VERSION, DEFAULT_EVENT_CAPACITY};
use crate::config::node_map::NodeMap;
use crate::config::parser::ConfigParser;
use crate::engine::{OptionValues, Severity};
use crate::errors::ConfigError;

/// The serializable engine configuration: every rule and rule set of one revision.
///
/// Everything the engine executes is derived from this document.
///
/// # Example
/// ```yaml
/// version: "1"
/// revision: 3
/// rules:
///   - id: large_amount
///     name: Large amount
///     stages:
///       - id: entry
///         nodeId: entry
///         nodeOptions:
///           fields: { amount: NUMBER }
///       - id: limit
///         nodeId: static_value
///         nodeOptions: { kind: NUMBER, value: 1000 }
///       - id: check
///         nodeId: compare_numbers
///         nodeOptions: { operation: GREATER }
///         inputs:
///           - { ruleStageId: entry, outputId: amount, inputId: inputA }
///           - { ruleStageId: limit, outputId: value, inputId: inputB }
///       - id: exit
///         nodeId: exit
///         inputs:
///           - { ruleStageId: check, outputId: result, inputId: result }
/// ruleSets:
///   - id: alerts
///     name: Alerts
///     entries:
///       - { ruleId: large_amount, severity: HIGH }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub version: String,
    pub revision: u64,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub rule_sets: Vec<RuleSetConfig>,
}

impl EngineConfig {
    /// An empty document at the current schema version.
    pub fn empty(revision: u64) -> Self {
        Self {
            version: CONFIG_SCHEMA_VERSION.to_string(),
            revision,
            rules: Vec::new(),
            rule_sets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub stages: Vec<RuleStageConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStageConfig {
    pub id: String,
    pub node_id: String,
    #[serde(default)]
    pub inputs: Vec<InputBinding>,
    #[serde(default)]
    pub node_options: OptionValues,
}

/// Wires one output of an earlier stage into an input of this stage.
///
/// Both `output_id` and `input_id` may be dotted paths into complex values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBinding {
    pub rule_stage_id: String,
    pub output_id: String,
    pub input_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries: Vec<RuleSetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetEntry {
    pub rule_id: String,
    pub severity: Severity,
}

/// Engine tuning knobs.
///
/// # Fields
/// * `max_concurrency` - Maximum stages in flight within one rule level (defaults to CPU count)
/// * `event_capacity` - Buffer size of the engine event channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineOptions {
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

/// Load a config document, choosing the decoder by file extension (`yaml`/`yml`, `json`, `toml`).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let cfg = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };
    Ok(cfg)
}

/// Load a config document and check it parses into a valid rule graph against `nodes`.
///
/// Every problem found is reported at once through [`ConfigError::Invalid`].
pub fn load_and_validate_config<P: AsRef<Path>>(
    path: P,
    nodes: &NodeMap,
) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    ConfigParser::parse(&cfg, nodes)?;
    Ok(cfg)
}
