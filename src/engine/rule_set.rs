// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::RuleSetEntry;
use crate::engine::context::ExecutionContext;
use crate::engine::rule::{Rule, RuleOutcome};
use crate::errors::ExecutionError;
use crate::traits::{ExecutionResult, Executor, ExecutorKind};
use crate::values::ValueMap;

/// Severity attached to a rule within a rule set, ordered from `None` up to `Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    VeryHigh,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::VeryHigh => "VERY_HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Result of running one member rule.
pub type RuleResult = ExecutionResult<ValueMap, RuleOutcome>;

/// The highest triggered severity plus every member rule's result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetOutcome {
    pub severity: Severity,
    pub triggered_rule: Option<String>,
    pub rules: BTreeMap<String, RuleResult>,
}

/// A prioritized collection of rules, reduced to the highest severity that triggered.
pub struct RuleSet {
    id: String,
    name: String,
    entries: Vec<RuleSetEntry>,
}

impl RuleSet {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entries: Vec<RuleSetEntry>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[RuleSetEntry] {
        &self.entries
    }

    fn resolve(&self, ctx: &ExecutionContext) -> Result<Vec<Arc<Rule>>, ExecutionError> {
        self.entries
            .iter()
            .map(|entry| {
                ctx.catalog()
                    .rule(&entry.rule_id)
                    .cloned()
                    .ok_or_else(|| ExecutionError::UnknownRule(entry.rule_id.clone()))
            })
            .collect()
    }
}

/// Stable max: the first entry wins among equal severities.
fn highest_triggered<'a>(
    entries: &'a [RuleSetEntry],
    rules: &BTreeMap<String, RuleResult>,
) -> Option<&'a RuleSetEntry> {
    entries
        .iter()
        .filter(|entry| {
            rules
                .get(&entry.rule_id)
                .map(|result| result.outputs.triggered())
                .unwrap_or(false)
        })
        .fold(None, |best: Option<&RuleSetEntry>, entry| match best {
            Some(current) if current.severity >= entry.severity => Some(current),
            _ => Some(entry),
        })
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish()
    }
}

#[async_trait]
impl Executor for RuleSet {
    type Inputs = ValueMap;
    type Outputs = RuleSetOutcome;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::RuleSet
    }

    fn validate_context(&self, ctx: &ExecutionContext) -> Result<(), String> {
        let mut reasons = Vec::new();
        for entry in &self.entries {
            match ctx.catalog().rule(&entry.rule_id) {
                Some(rule) => {
                    if let Err(reason) = rule.validate_context(&rule.create_context(ctx)) {
                        reasons.push(format!("rule '{}': {}", entry.rule_id, reason));
                    }
                }
                None => reasons.push(format!("unknown rule '{}'", entry.rule_id)),
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons.join("; "))
        }
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<RuleSetOutcome, ExecutionError> {
        let rules = self.resolve(ctx)?;

        let tasks: Vec<_> = rules
            .into_iter()
            .map(|rule| {
                let rule_inputs = inputs.clone();
                let rule_ctx = ctx.clone();
                let rule_id = rule.id().to_string();
                let task = tokio::spawn(async move { rule.run(rule_inputs, &rule_ctx).await });
                (rule_id, task)
            })
            .collect();

        // Every member settles before severities are compared.
        let mut results = BTreeMap::new();
        let mut first_error = None;
        for (rule_id, task) in tasks {
            match task.await {
                Ok(Ok(result)) => {
                    results.insert(rule_id, result);
                }
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(join_error) => {
                    first_error.get_or_insert(ExecutionError::InternalError {
                        message: format!("Task join error for rule '{}': {}", rule_id, join_error),
                    });
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let best = highest_triggered(&self.entries, &results);
        Ok(RuleSetOutcome {
            severity: best.map(|entry| entry.severity).unwrap_or_default(),
            triggered_rule: best.map(|entry| entry.rule_id.clone()),
            rules: results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputBinding;
    use crate::engine::catalog::Catalog;
    use crate::engine::node::OptionValues;
    use crate::engine::stage::RuleStage;
    use crate::nodes::{entry, exit, static_value};
    use crate::values::TypedValue;
    use serde_json::json;

    /// A rule whose exit result is a constant.
    fn constant_rule(id: &str, triggered: bool) -> Arc<Rule> {
        Arc::new(
            Rule::new(
                id,
                id,
                vec![
                    RuleStage::new(
                        "flag",
                        Arc::new(static_value::static_value()),
                        OptionValues::from([
                            ("kind".to_string(), json!("BOOLEAN")),
                            ("value".to_string(), json!(triggered)),
                        ]),
                        vec![],
                    ),
                    RuleStage::new(
                        "exit",
                        Arc::new(exit::exit_node()),
                        OptionValues::new(),
                        vec![InputBinding {
                            rule_stage_id: "flag".into(),
                            output_id: "value".into(),
                            input_id: "result".into(),
                        }],
                    ),
                ],
            )
            .unwrap(),
        )
    }

    fn entry_of(rule_id: &str, severity: Severity) -> RuleSetEntry {
        RuleSetEntry {
            rule_id: rule_id.to_string(),
            severity,
        }
    }

    async fn severity_of(a_triggers: bool, b_triggers: bool) -> RuleSetOutcome {
        let catalog = Catalog::new(
            1,
            vec![constant_rule("rule_a", a_triggers), constant_rule("rule_b", b_triggers)],
            vec![],
        );
        let rule_set = RuleSet::new(
            "alerts",
            "Alerts",
            vec![entry_of("rule_a", Severity::Low), entry_of("rule_b", Severity::Critical)],
        );
        let ctx = ExecutionContext::new(Arc::new(catalog));
        rule_set.run(ValueMap::new(), &ctx).await.unwrap().outputs
    }

    #[tokio::test]
    async fn test_severity_aggregation() {
        let only_a = severity_of(true, false).await;
        assert_eq!(only_a.severity, Severity::Low);
        assert_eq!(only_a.triggered_rule.as_deref(), Some("rule_a"));

        let neither = severity_of(false, false).await;
        assert_eq!(neither.severity, Severity::None);
        assert!(neither.triggered_rule.is_none());
        assert_eq!(neither.rules.len(), 2);

        let both = severity_of(true, true).await;
        assert_eq!(both.severity, Severity::Critical);
        assert_eq!(both.triggered_rule.as_deref(), Some("rule_b"));
    }

    #[test]
    fn test_ties_keep_first_entry() {
        let entries = vec![entry_of("first", Severity::High), entry_of("second", Severity::High)];
        let result = |triggered: bool| RuleResult {
            execution_time_ms: 0.0,
            inputs: ValueMap::new(),
            outputs: RuleOutcome {
                exit: ValueMap::from([("result".to_string(), TypedValue::Boolean(triggered))]),
                stages: BTreeMap::new(),
            },
        };
        let results = BTreeMap::from([
            ("first".to_string(), result(true)),
            ("second".to_string(), result(true)),
        ]);

        let best = highest_triggered(&entries, &results).unwrap();
        assert_eq!(best.rule_id, "first");
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::None < Severity::Low);
        assert!(Severity::High < Severity::VeryHigh);
        assert!(Severity::VeryHigh < Severity::Critical);
        assert_eq!(serde_json::to_value(Severity::VeryHigh).unwrap(), json!("VERY_HIGH"));
    }

    #[tokio::test]
    async fn test_validate_context_reports_unknown_rules() {
        let rule_set = RuleSet::new("alerts", "Alerts", vec![entry_of("ghost", Severity::Low)]);
        let ctx = ExecutionContext::new(Arc::new(Catalog::default()));

        let err = rule_set.run(ValueMap::new(), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("unknown rule 'ghost'"));
    }

    #[tokio::test]
    async fn test_member_failure_fails_the_set() {
        let strict = Arc::new(
            Rule::new(
                "strict",
                "Strict",
                vec![RuleStage::new(
                    "entry",
                    Arc::new(entry::entry_node()),
                    OptionValues::from([("fields".to_string(), json!({"amount": "NUMBER"}))]),
                    vec![],
                )],
            )
            .unwrap(),
        );
        let catalog = Catalog::new(1, vec![strict], vec![]);
        let rule_set = RuleSet::new("set", "Set", vec![entry_of("strict", Severity::High)]);
        let ctx = ExecutionContext::new(Arc::new(catalog));

        let err = rule_set.run(ValueMap::new(), &ctx).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Failed { kind: ExecutorKind::RuleSet, .. }));
        assert!(err.to_string().contains("amount: missing value"));
    }
}
