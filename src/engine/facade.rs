// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::consts::INITIAL_REVISION;
use crate::config::{
    ConfigParser, ConfigProvider, EngineConfig, EngineOptions, NodeMap, RuleConfig, RuleSetConfig,
};
use crate::engine::catalog::Catalog;
use crate::engine::context::{default_concurrency, ExecutionContext};
use crate::engine::events::{EngineEvent, EventBus, EventSubscriber};
use crate::engine::node::{OptionValues, SerializedNode};
use crate::engine::rule::Rule;
use crate::engine::rule_set::{RuleResult, RuleSetOutcome};
use crate::errors::{ConfigError, EngineError, ExecutionError, ValidationError};
use crate::observability::messages::engine::{
    ConfigReplaced, ExecutionFailed, RuleExecutionCompleted, RuleSetExecutionCompleted,
    StaleRevisionRejected,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{ExecutionResult, Executor, ExecutorKind};
use crate::values::{TypedValue, ValueMap};

/// Result of executing a rule set through the engine.
pub type RuleSetResult = ExecutionResult<ValueMap, RuleSetOutcome>;

/// The installed document together with the graph parsed from it.
struct ActiveConfig {
    config: EngineConfig,
    catalog: Arc<Catalog>,
}

/// Orchestration surface over the node registry and the active rule graph.
///
/// The active configuration is swapped atomically as a whole; executions already running keep
/// the graph they started with.
pub struct Engine {
    nodes: NodeMap,
    active: ArcSwap<ActiveConfig>,
    provider: Option<Arc<dyn ConfigProvider>>,
    events: Arc<EventBus>,
    options: EngineOptions,
    replace_lock: Mutex<()>,
}

impl Engine {
    pub fn new(
        nodes: NodeMap,
        provider: Option<Arc<dyn ConfigProvider>>,
        events: Arc<EventBus>,
        options: EngineOptions,
    ) -> Self {
        let initial = ActiveConfig {
            config: EngineConfig::empty(INITIAL_REVISION),
            catalog: Arc::new(Catalog::default()),
        };
        Self {
            nodes,
            active: ArcSwap::from_pointee(initial),
            provider,
            events,
            options,
            replace_lock: Mutex::new(()),
        }
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn active_config(&self) -> EngineConfig {
        self.active.load().config.clone()
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.active.load().catalog)
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    /// Validate `config`, hand it to the provider, then make it active.
    ///
    /// Rejected unless `config.revision` is newer than the active revision. Nothing changes if
    /// validation or saving fails.
    pub async fn replace_active_config(&self, config: EngineConfig) -> Result<(), EngineError> {
        let _guard = self.replace_lock.lock().await;
        let catalog = self.prepare(&config)?;
        if let Some(provider) = &self.provider {
            provider.save(&config).await?;
        }
        self.install(config, catalog);
        Ok(())
    }

    /// Install the provider's latest revision if it is newer than the active one.
    ///
    /// Returns the revision active afterwards.
    pub async fn load_latest(&self) -> Result<u64, EngineError> {
        let provider = self.provider.as_ref().ok_or(EngineError::NoProvider)?;
        let _guard = self.replace_lock.lock().await;

        let active = self.active.load().config.revision;
        let latest = match provider.latest_revision().await? {
            Some(latest) if latest > active => latest,
            _ => return Ok(active),
        };
        let config = provider.load(latest).await?;
        let catalog = self.prepare(&config)?;
        self.install(config, catalog);
        Ok(latest)
    }

    pub async fn execute_rule(
        &self,
        rule_id: &str,
        inputs: &serde_json::Value,
    ) -> Result<RuleResult, EngineError> {
        let catalog = self.catalog();
        let rule = catalog
            .rule(rule_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownRule(rule_id.to_string()))?;
        let ctx = self.context(Arc::clone(&catalog));
        self.run_rule(&rule, inputs, &ctx).await
    }

    pub async fn execute_rule_set(
        &self,
        rule_set_id: &str,
        inputs: &serde_json::Value,
    ) -> Result<RuleSetResult, EngineError> {
        let catalog = self.catalog();
        let rule_set = catalog
            .rule_set(rule_set_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownRuleSet(rule_set_id.to_string()))?;
        let ctx = self.context(Arc::clone(&catalog));

        let result: Result<RuleSetResult, ExecutionError> = async {
            let values = structural_inputs(inputs, ExecutorKind::RuleSet, rule_set_id)?;
            rule_set.run(values, &ctx).await
        }
        .await;

        match result {
            Ok(result) => {
                let outcome = &result.outputs;
                RuleSetExecutionCompleted {
                    rule_set_id,
                    severity: &outcome.severity.to_string(),
                    triggered_rule: outcome.triggered_rule.as_deref(),
                    duration: std::time::Duration::from_secs_f64(result.execution_time_ms / 1000.0),
                }
                .log();
                self.events.emit(EngineEvent::RuleSetExecuted {
                    execution_id: ctx.execution_id().to_string(),
                    rule_set_id: rule_set_id.to_string(),
                    severity: outcome.severity,
                    triggered_rule: outcome.triggered_rule.clone(),
                    execution_time_ms: result.execution_time_ms,
                });
                Ok(result)
            }
            Err(e) => Err(self.failed(&ctx, ExecutorKind::RuleSet, rule_set_id, e)),
        }
    }

    /// Execute a candidate rule against the active rules without installing it.
    ///
    /// Runs in preview mode, so nested rule invocations also report their stage results.
    pub async fn preview_rule(
        &self,
        rule_config: &RuleConfig,
        inputs: &serde_json::Value,
    ) -> Result<RuleResult, EngineError> {
        let (rule, catalog) = self.candidate_rule(rule_config)?;
        let ctx = self.context(catalog).with_preview(true);
        self.run_rule(&rule, inputs, &ctx).await
    }

    /// Structural and semantic check of a rule, evaluated against the active rules.
    pub fn validate_rule_config(&self, rule_config: &RuleConfig) -> Result<(), EngineError> {
        self.candidate_rule(rule_config).map(|_| ())
    }

    /// Check a rule set's entries resolve to valid active rules.
    pub fn validate_rule_set_config(
        &self,
        rule_set_config: &RuleSetConfig,
    ) -> Result<(), EngineError> {
        let rule_set = Arc::new(ConfigParser::parse_rule_set(rule_set_config));
        let catalog = Arc::new(self.catalog().with_rule_set(Arc::clone(&rule_set)));
        let ctx = self.context(catalog);
        rule_set
            .validate_context(&rule_set.create_context(&ctx))
            .map_err(|reason| {
                invalid(ValidationError::InvalidRuleSet {
                    rule_set_id: rule_set_config.id.clone(),
                    reason,
                })
            })
    }

    /// Describe one node with its metadata resolved for `options`.
    pub fn export_serialized_node(
        &self,
        node_id: &str,
        options: &OptionValues,
    ) -> Result<SerializedNode, EngineError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
        let ctx = self.context(self.catalog()).with_options(options.clone());
        Ok(node.serialize(&ctx))
    }

    /// Describe every registered node, in registration order.
    pub fn export_serialized_nodes(&self, options: &OptionValues) -> Vec<SerializedNode> {
        let ctx = self.context(self.catalog()).with_options(options.clone());
        self.nodes.iter().map(|node| node.serialize(&ctx)).collect()
    }

    fn context(&self, catalog: Arc<Catalog>) -> ExecutionContext {
        ExecutionContext::new(catalog)
            .with_max_concurrency(self.options.max_concurrency.unwrap_or_else(default_concurrency))
    }

    fn prepare(&self, config: &EngineConfig) -> Result<Arc<Catalog>, EngineError> {
        let active = self.active.load().config.revision;
        if config.revision <= active {
            StaleRevisionRejected {
                proposed: config.revision,
                active,
            }
            .log();
            return Err(ConfigError::StaleRevision {
                proposed: config.revision,
                active,
            }
            .into());
        }
        Ok(ConfigParser::parse(config, &self.nodes)?)
    }

    fn install(&self, config: EngineConfig, catalog: Arc<Catalog>) {
        let previous = self.active.swap(Arc::new(ActiveConfig { config, catalog }));
        let current = self.active.load();
        ConfigReplaced {
            previous_revision: previous.config.revision,
            revision: current.config.revision,
            rule_count: current.catalog.rules().len(),
            rule_set_count: current.catalog.rule_sets().len(),
        }
        .log();
        self.events.emit(EngineEvent::ConfigReplaced {
            previous_revision: previous.config.revision,
            revision: current.config.revision,
            rule_count: current.catalog.rules().len(),
            rule_set_count: current.catalog.rule_sets().len(),
        });
    }

    fn candidate_rule(
        &self,
        rule_config: &RuleConfig,
    ) -> Result<(Arc<Rule>, Arc<Catalog>), EngineError> {
        let rule = Arc::new(ConfigParser::parse_rule(rule_config, &self.nodes).map_err(invalid)?);
        let catalog = Arc::new(self.catalog().with_rule(Arc::clone(&rule)));
        let ctx = self.context(Arc::clone(&catalog));
        rule.validate_context(&rule.create_context(&ctx))
            .map_err(|reason| {
                invalid(ValidationError::InvalidRule {
                    rule_id: rule_config.id.clone(),
                    reason,
                })
            })?;
        Ok((rule, catalog))
    }

    async fn run_rule(
        &self,
        rule: &Rule,
        inputs: &serde_json::Value,
        ctx: &ExecutionContext,
    ) -> Result<RuleResult, EngineError> {
        let result: Result<RuleResult, ExecutionError> = async {
            let values = rule_inputs(rule, inputs, ctx)?;
            rule.run(values, ctx).await
        }
        .await;

        match result {
            Ok(result) => {
                let triggered = result.outputs.triggered();
                RuleExecutionCompleted {
                    rule_id: rule.id(),
                    triggered,
                    duration: std::time::Duration::from_secs_f64(result.execution_time_ms / 1000.0),
                }
                .log();
                self.events.emit(EngineEvent::RuleExecuted {
                    execution_id: ctx.execution_id().to_string(),
                    rule_id: rule.id().to_string(),
                    triggered,
                    execution_time_ms: result.execution_time_ms,
                });
                Ok(result)
            }
            Err(e) => Err(self.failed(ctx, ExecutorKind::Rule, rule.id(), e)),
        }
    }

    fn failed(
        &self,
        ctx: &ExecutionContext,
        kind: ExecutorKind,
        id: &str,
        error: ExecutionError,
    ) -> EngineError {
        let target = match kind {
            ExecutorKind::RuleSet => "rule set",
            _ => "rule",
        };
        ExecutionFailed {
            target,
            id,
            error: &error,
        }
        .log();
        self.events.emit(EngineEvent::ExecutionFailed {
            execution_id: ctx.execution_id().to_string(),
            kind,
            id: id.to_string(),
            error: error.to_string(),
        });
        error.into()
    }
}

fn invalid(error: ValidationError) -> EngineError {
    ConfigError::Invalid(vec![error]).into()
}

/// Wrap facade inputs for `rule`: coerced through the ENTRY shape when there is one.
fn rule_inputs(
    rule: &Rule,
    inputs: &serde_json::Value,
    ctx: &ExecutionContext,
) -> Result<ValueMap, ExecutionError> {
    if rule.entry_stage().is_none() {
        return structural_inputs(inputs, ExecutorKind::Rule, rule.id());
    }
    rule.input_shape(ctx)
        .wrap(inputs)
        .map_err(|reasons| ExecutionError::InvalidInputs {
            kind: ExecutorKind::Rule,
            id: rule.id().to_string(),
            reason: reasons.join("; "),
        })
}

fn structural_inputs(
    inputs: &serde_json::Value,
    kind: ExecutorKind,
    id: &str,
) -> Result<ValueMap, ExecutionError> {
    match TypedValue::from_json(inputs) {
        TypedValue::Record(values) => Ok(values),
        TypedValue::Null => Ok(ValueMap::new()),
        other => Err(ExecutionError::InvalidInputs {
            kind,
            id: id.to_string(),
            reason: format!("expected an object of named inputs, got {}", other.type_name()),
        }),
    }
}
