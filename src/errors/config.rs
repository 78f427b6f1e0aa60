// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// One structural or semantic problem found in an engine configuration document.
///
/// Validation collects every problem it can find before giving up, so these usually travel
/// together inside [`ConfigError::Invalid`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate rule ID: '{rule_id}'")]
    DuplicateRuleId { rule_id: String },

    #[error("Duplicate rule set ID: '{rule_set_id}'")]
    DuplicateRuleSetId { rule_set_id: String },

    #[error("Rule '{rule_id}' has duplicate stage ID '{stage_id}'")]
    DuplicateStageId { rule_id: String, stage_id: String },

    #[error("Stage '{stage_id}' of rule '{rule_id}' uses unknown node '{node_id}'")]
    UnknownNode {
        rule_id: String,
        stage_id: String,
        node_id: String,
    },

    /// A stage binds an input from a stage that does not exist in the same rule
    #[error("Stage '{stage_id}' of rule '{rule_id}' reads from '{missing_stage}' which does not exist")]
    UnresolvedStage {
        rule_id: String,
        stage_id: String,
        missing_stage: String,
    },

    #[error("Invalid rule stage dependencies in rule '{rule_id}': cycle among [{}]", .stages.join(", "))]
    CyclicDependency { rule_id: String, stages: Vec<String> },

    #[error("Rule '{rule_id}' has more than one ENTRY stage: [{}]", .stages.join(", "))]
    MultipleEntryStages { rule_id: String, stages: Vec<String> },

    #[error("Rule '{rule_id}' has more than one EXIT stage: [{}]", .stages.join(", "))]
    MultipleExitStages { rule_id: String, stages: Vec<String> },

    #[error("Rule set '{rule_set_id}' references unknown rule '{rule_id}'")]
    UnknownRule { rule_set_id: String, rule_id: String },

    #[error("Invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("Invalid rule set '{rule_set_id}': {reason}")]
    InvalidRuleSet { rule_set_id: String, reason: String },
}

/// Errors raised while loading, parsing or installing a configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Unsupported config schema version '{found}' (expected '{expected}')")]
    UnsupportedVersion { found: String, expected: String },

    /// Revisions only move forward
    #[error("Config revision {proposed} is not newer than active revision {active}")]
    StaleRevision { proposed: u64, active: u64 },

    #[error("Configuration validation failed:\n{}", format_all(.0))]
    Invalid(Vec<ValidationError>),

    #[error("Config provider error: {0}")]
    Provider(String),
}

impl ConfigError {
    /// The individual validation problems, if this is a validation failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ConfigError::Invalid(errors)
    }
}

fn format_all(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
