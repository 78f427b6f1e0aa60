// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Conversion between [`EngineConfig`] documents and the live rule graph.
//!
//! # Validation Pipeline
//!
//! [`ConfigParser::parse`] runs two passes and reports every problem a pass finds:
//!
//! 1. **Structural**: schema version, unique rule and rule set ids, known node ids, stage
//!    uniqueness and references, single ENTRY/EXIT stage, acyclic stage dependencies, rule set
//!    entries naming rules that exist in the document
//! 2. **Semantic**: every rule's and rule set's `validate_context` over the assembled graph
//!    (option values, input wiring, value-kind compatibility, exit shape)
//!
//! The semantic pass needs a complete graph, so it only runs once the structural pass is clean.
//! An invalid document never yields a catalog.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::consts::CONFIG_SCHEMA_VERSION;
use crate::config::loader::{EngineConfig, RuleConfig, RuleSetConfig, RuleStageConfig};
use crate::config::node_map::NodeMap;
use crate::engine::{Catalog, ExecutionContext, Rule, RuleSet, RuleStage};
use crate::errors::{ConfigError, ValidationError};
use crate::observability::messages::validation::{
    ValidationCompleted, ValidationFailed, ValidationProblem, ValidationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Executor;

pub struct ConfigParser;

impl ConfigParser {
    /// Build and fully validate the rule graph described by `config`.
    pub fn parse(config: &EngineConfig, nodes: &NodeMap) -> Result<Arc<Catalog>, ConfigError> {
        let start_msg = ValidationStarted {
            revision: config.revision,
            rule_count: config.rules.len(),
            rule_set_count: config.rule_sets.len(),
        };
        let span = start_msg.span("config_parse");
        let _guard = span.enter();
        start_msg.log();

        let start = Instant::now();

        if config.version != CONFIG_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version.clone(),
                expected: CONFIG_SCHEMA_VERSION.to_string(),
            });
        }

        let (rules, rule_sets) = Self::build(config, nodes)
            .map_err(|errors| Self::reject(config.revision, errors))?;

        let catalog = Arc::new(Catalog::new(config.revision, rules, rule_sets));
        let errors = Self::validate(&catalog);
        if !errors.is_empty() {
            return Err(Self::reject(config.revision, errors));
        }

        ValidationCompleted {
            revision: config.revision,
            duration: start.elapsed(),
        }
        .log();
        Ok(catalog)
    }

    /// Build one rule, resolving its stages' node ids against `nodes`.
    pub fn parse_rule(config: &RuleConfig, nodes: &NodeMap) -> Result<Rule, ValidationError> {
        let stages = config
            .stages
            .iter()
            .map(|stage| Self::parse_stage(&config.id, stage, nodes))
            .collect::<Result<Vec<_>, _>>()?;
        Rule::new(config.id.clone(), config.name.clone(), stages)
    }

    pub fn parse_rule_set(config: &RuleSetConfig) -> RuleSet {
        RuleSet::new(config.id.clone(), config.name.clone(), config.entries.clone())
    }

    /// Semantic validation of every rule and rule set in `catalog`.
    pub fn validate(catalog: &Arc<Catalog>) -> Vec<ValidationError> {
        let ctx = ExecutionContext::new(Arc::clone(catalog));
        let mut errors = Vec::new();
        for rule in catalog.rules() {
            if let Err(reason) = rule.validate_context(&rule.create_context(&ctx)) {
                errors.push(ValidationError::InvalidRule {
                    rule_id: rule.id().to_string(),
                    reason,
                });
            }
        }
        for rule_set in catalog.rule_sets() {
            if let Err(reason) = rule_set.validate_context(&rule_set.create_context(&ctx)) {
                errors.push(ValidationError::InvalidRuleSet {
                    rule_set_id: rule_set.id().to_string(),
                    reason,
                });
            }
        }
        errors
    }

    /// Flatten a rule graph back into a document tagged with the current schema version.
    ///
    /// Stages are written level by level, so their order may differ from the original document.
    pub fn export(revision: u64, rules: &[Arc<Rule>], rule_sets: &[Arc<RuleSet>]) -> EngineConfig {
        EngineConfig {
            version: CONFIG_SCHEMA_VERSION.to_string(),
            revision,
            rules: rules.iter().map(|rule| Self::export_rule(rule)).collect(),
            rule_sets: rule_sets
                .iter()
                .map(|rule_set| RuleSetConfig {
                    id: rule_set.id().to_string(),
                    name: rule_set.name().to_string(),
                    entries: rule_set.entries().to_vec(),
                })
                .collect(),
        }
    }

    pub fn export_catalog(catalog: &Catalog) -> EngineConfig {
        Self::export(catalog.revision(), catalog.rules(), catalog.rule_sets())
    }

    pub fn export_rule(rule: &Rule) -> RuleConfig {
        RuleConfig {
            id: rule.id().to_string(),
            name: rule.name().to_string(),
            stages: rule
                .levels()
                .iter()
                .flatten()
                .map(|stage| RuleStageConfig {
                    id: stage.id().to_string(),
                    node_id: stage.node().id().to_string(),
                    inputs: stage.inputs().to_vec(),
                    node_options: stage.options().clone(),
                })
                .collect(),
        }
    }

    fn parse_stage(
        rule_id: &str,
        config: &RuleStageConfig,
        nodes: &NodeMap,
    ) -> Result<RuleStage, ValidationError> {
        let node = nodes
            .get(&config.node_id)
            .ok_or_else(|| ValidationError::UnknownNode {
                rule_id: rule_id.to_string(),
                stage_id: config.id.clone(),
                node_id: config.node_id.clone(),
            })?;
        Ok(RuleStage::new(
            config.id.clone(),
            Arc::clone(node),
            config.node_options.clone(),
            config.inputs.clone(),
        ))
    }

    #[allow(clippy::type_complexity)]
    fn build(
        config: &EngineConfig,
        nodes: &NodeMap,
    ) -> Result<(Vec<Arc<Rule>>, Vec<Arc<RuleSet>>), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut rule_ids = HashSet::new();
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule_config in &config.rules {
            if !rule_ids.insert(rule_config.id.as_str()) {
                errors.push(ValidationError::DuplicateRuleId {
                    rule_id: rule_config.id.clone(),
                });
                continue;
            }
            match Self::parse_rule(rule_config, nodes) {
                Ok(rule) => rules.push(Arc::new(rule)),
                Err(e) => errors.push(e),
            }
        }

        let mut rule_set_ids = HashSet::new();
        let mut rule_sets = Vec::with_capacity(config.rule_sets.len());
        for rule_set_config in &config.rule_sets {
            if !rule_set_ids.insert(rule_set_config.id.as_str()) {
                errors.push(ValidationError::DuplicateRuleSetId {
                    rule_set_id: rule_set_config.id.clone(),
                });
                continue;
            }
            for entry in &rule_set_config.entries {
                if !rule_ids.contains(entry.rule_id.as_str()) {
                    errors.push(ValidationError::UnknownRule {
                        rule_set_id: rule_set_config.id.clone(),
                        rule_id: entry.rule_id.clone(),
                    });
                }
            }
            rule_sets.push(Arc::new(Self::parse_rule_set(rule_set_config)));
        }

        if errors.is_empty() {
            Ok((rules, rule_sets))
        } else {
            Err(errors)
        }
    }

    fn reject(revision: u64, errors: Vec<ValidationError>) -> ConfigError {
        for error in &errors {
            ValidationProblem { error }.log();
        }
        ValidationFailed {
            revision,
            error_count: errors.len(),
        }
        .log();
        ConfigError::Invalid(errors)
    }
}
