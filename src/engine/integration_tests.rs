// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;
use std::sync::Arc;

use crate::config::{
    load_config, ConfigProvider, EngineConfig, InMemoryConfigProvider, RuleConfig, RuleSetConfig,
    RuleSetEntry, RuntimeBuilder,
};
use crate::engine::{Engine, EngineEvent, OptionValues, Severity};
use crate::errors::{ConfigError, EngineError, ExecutionError};
use crate::values::{TypedValue, ValueMap};

/// Integration tests driving the engine facade over the built-in nodes
#[cfg(test)]
mod tests {
    use super::*;

    const FRAUD_RULES: &str = "configs/fraud-rules.yaml";

    async fn fraud_engine() -> Engine {
        RuntimeBuilder::new()
            .from_config_file(FRAUD_RULES)
            .await
            .expect("fraud rules should install")
    }

    fn rule_config(value: serde_json::Value) -> RuleConfig {
        serde_json::from_value(value).expect("valid rule document")
    }

    /// entry -> execute large_amount -> exit
    fn delegating_rule() -> RuleConfig {
        rule_config(json!({
            "id": "delegate",
            "stages": [
                { "id": "entry", "nodeId": "entry", "nodeOptions": { "fields": { "amount": "NUMBER", "currency": "STRING" } } },
                { "id": "call", "nodeId": "execute_rule", "nodeOptions": { "ruleId": "large_amount" },
                  "inputs": [
                    { "ruleStageId": "entry", "outputId": "amount", "inputId": "amount" },
                    { "ruleStageId": "entry", "outputId": "currency", "inputId": "currency" }
                  ] },
                { "id": "exit", "nodeId": "exit",
                  "inputs": [ { "ruleStageId": "call", "outputId": "result", "inputId": "result" } ] }
            ]
        }))
    }

    /// A rule whose only work is invoking `target` with its boolean `flag`.
    fn calling_rule(id: &str, target: &str) -> RuleConfig {
        rule_config(json!({
            "id": id,
            "stages": [
                { "id": "entry", "nodeId": "entry", "nodeOptions": { "fields": { "flag": "BOOLEAN" } } },
                { "id": "call", "nodeId": "execute_rule", "nodeOptions": { "ruleId": target },
                  "inputs": [ { "ruleStageId": "entry", "outputId": "flag", "inputId": "flag" } ] },
                { "id": "exit", "nodeId": "exit",
                  "inputs": [ { "ruleStageId": "call", "outputId": "result", "inputId": "result" } ] }
            ]
        }))
    }

    /// Publishes its `flag` input as the result.
    fn flag_rule(id: &str) -> RuleConfig {
        rule_config(json!({
            "id": id,
            "stages": [
                { "id": "entry", "nodeId": "entry", "nodeOptions": { "fields": { "flag": "BOOLEAN" } } },
                { "id": "exit", "nodeId": "exit",
                  "inputs": [ { "ruleStageId": "entry", "outputId": "flag", "inputId": "result" } ] }
            ]
        }))
    }

    /// Invokes `target` with `go` only when `go` is also true.
    fn gated_rule(id: &str, target: &str) -> RuleConfig {
        rule_config(json!({
            "id": id,
            "stages": [
                { "id": "entry", "nodeId": "entry", "nodeOptions": { "fields": { "go": "BOOLEAN" } } },
                { "id": "call", "nodeId": "execute_rule",
                  "nodeOptions": { "ruleId": target, "conditional": true },
                  "inputs": [
                    { "ruleStageId": "entry", "outputId": "go", "inputId": "go" },
                    { "ruleStageId": "entry", "outputId": "go", "inputId": "shouldExecute" }
                  ] },
                { "id": "exit", "nodeId": "exit",
                  "inputs": [ { "ruleStageId": "call", "outputId": "result", "inputId": "result" } ] }
            ]
        }))
    }

    /// Publishes `go` as the result.
    fn go_rule(id: &str) -> RuleConfig {
        rule_config(json!({
            "id": id,
            "stages": [
                { "id": "entry", "nodeId": "entry", "nodeOptions": { "fields": { "go": "BOOLEAN" } } },
                { "id": "exit", "nodeId": "exit",
                  "inputs": [ { "ruleStageId": "entry", "outputId": "go", "inputId": "result" } ] }
            ]
        }))
    }

    fn revision(
        revision: u64,
        rules: Vec<RuleConfig>,
        rule_sets: Vec<RuleSetConfig>,
    ) -> EngineConfig {
        let mut config = EngineConfig::empty(revision);
        config.rules = rules;
        config.rule_sets = rule_sets;
        config
    }

    #[tokio::test]
    async fn test_rule_triggers_on_coerced_inputs() {
        let engine = fraud_engine().await;

        // amount arrives as a string and is coerced by the ENTRY shape
        let hit = engine
            .execute_rule("large_amount", &json!({"amount": "5000", "currency": "EUR"}))
            .await
            .unwrap();
        assert!(hit.outputs.triggered());
        assert_eq!(hit.inputs.get("amount"), Some(&TypedValue::Number(5000.0)));
        assert_eq!(hit.outputs.exit_json(), json!({"result": true}));

        let miss = engine
            .execute_rule("large_amount", &json!({"amount": 10, "currency": "EUR"}))
            .await
            .unwrap();
        assert!(!miss.outputs.triggered());
    }

    #[tokio::test]
    async fn test_rule_set_reports_highest_triggered_severity() {
        let engine = fraud_engine().await;

        let result = engine
            .execute_rule_set("payment_alerts", &json!({"amount": 5000, "currency": "usd"}))
            .await
            .unwrap();
        assert_eq!(result.outputs.severity, Severity::High);
        assert_eq!(result.outputs.triggered_rule.as_deref(), Some("large_foreign"));
        assert_eq!(result.outputs.rules.len(), 3);

        let result = engine
            .execute_rule_set("payment_alerts", &json!({"amount": 5000, "currency": "eur"}))
            .await
            .unwrap();
        assert_eq!(result.outputs.severity, Severity::Medium);
        assert_eq!(result.outputs.triggered_rule.as_deref(), Some("large_amount"));

        let result = engine
            .execute_rule_set("payment_alerts", &json!({"amount": 12, "currency": "EUR"}))
            .await
            .unwrap();
        assert_eq!(result.outputs.severity, Severity::None);
        assert_eq!(result.outputs.triggered_rule, None);
    }

    #[tokio::test]
    async fn test_rule_set_with_wrong_inputs_fails() {
        let engine = fraud_engine().await;

        let err = engine
            .execute_rule_set("payment_alerts", &json!({"amount": "lots"}))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Execution(ExecutionError::Failed { .. })));

        let err = engine
            .execute_rule_set("payment_alerts", &json!([1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Execution(ExecutionError::InvalidInputs { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_reported() {
        let engine = fraud_engine().await;

        assert!(matches!(
            engine.execute_rule("nope", &json!({})).await,
            Err(EngineError::UnknownRule(ref id)) if id == "nope"
        ));
        assert!(matches!(
            engine.execute_rule_set("nope", &json!({})).await,
            Err(EngineError::UnknownRuleSet(_))
        ));
    }

    #[tokio::test]
    async fn test_recursive_rules_fail_with_call_chain() {
        let engine = RuntimeBuilder::new().build().unwrap();
        engine
            .replace_active_config(revision(
                1,
                vec![calling_rule("loop_a", "loop_b"), calling_rule("loop_b", "loop_a")],
                vec![],
            ))
            .await
            .unwrap();

        let err = engine
            .execute_rule("loop_a", &json!({"flag": true}))
            .await
            .unwrap_err();
        let EngineError::Execution(err) = err else {
            panic!("expected an execution error");
        };
        assert!(matches!(err.root_cause(), ExecutionError::RecursiveRule { .. }));
        assert!(err
            .to_string()
            .contains("recursive rule cycle detected: loop_a -> loop_b -> loop_a"));
    }

    #[tokio::test]
    async fn test_nested_rules_without_cycles_run() {
        let engine = RuntimeBuilder::new().build().unwrap();
        engine
            .replace_active_config(revision(
                1,
                vec![calling_rule("outer", "inner"), flag_rule("inner")],
                vec![],
            ))
            .await
            .unwrap();

        let result = engine.execute_rule("outer", &json!({"flag": true})).await.unwrap();
        assert!(result.outputs.triggered());
        // outside preview the nested stages stay private
        assert!(result.outputs.stages["call"].outputs.get("stages").is_none());
    }

    #[tokio::test]
    async fn test_conditional_call_runs_only_when_asked() {
        let engine = RuntimeBuilder::new().build().unwrap();
        engine
            .replace_active_config(revision(
                1,
                vec![gated_rule("gate", "target"), go_rule("target")],
                vec![],
            ))
            .await
            .unwrap();

        let passed = engine.execute_rule("gate", &json!({"go": true})).await.unwrap();
        assert!(passed.outputs.triggered());

        let skipped = engine.execute_rule("gate", &json!({"go": false})).await.unwrap();
        assert_eq!(skipped.outputs.exit_json(), json!({"result": false}));
        assert_eq!(
            skipped.outputs.stages["call"].outputs,
            ValueMap::from([("result".to_string(), TypedValue::Boolean(false))])
        );
    }

    #[tokio::test]
    async fn test_skipped_self_call_is_not_recursion() {
        let engine = RuntimeBuilder::new().build().unwrap();
        engine
            .replace_active_config(revision(1, vec![gated_rule("gated", "gated")], vec![]))
            .await
            .unwrap();

        let result = engine.execute_rule("gated", &json!({"go": false})).await.unwrap();
        assert_eq!(result.outputs.exit_json(), json!({"result": false}));

        // taking the call recurses into the running rule
        let err = engine.execute_rule("gated", &json!({"go": true})).await.unwrap_err();
        let EngineError::Execution(err) = err else {
            panic!("expected an execution error");
        };
        assert!(err
            .to_string()
            .contains("recursive rule cycle detected: gated -> gated"));
    }

    #[tokio::test]
    async fn test_preview_runs_candidate_without_installing_it() {
        let engine = fraud_engine().await;

        let result = engine
            .preview_rule(&delegating_rule(), &json!({"amount": 2000, "currency": "EUR"}))
            .await
            .unwrap();
        assert!(result.outputs.triggered());

        let nested = result.outputs.stages["call"].outputs.get("stages").unwrap();
        let nested = nested.as_record().unwrap();
        assert!(nested.contains_key("limit"));
        assert!(nested.contains_key("check"));

        assert!(engine.catalog().rule("delegate").is_none());
        assert_eq!(engine.active_config().revision, 1);
    }

    #[tokio::test]
    async fn test_validate_rule_config() {
        let engine = fraud_engine().await;
        assert!(engine.validate_rule_config(&delegating_rule()).is_ok());

        let mut broken = delegating_rule();
        broken.stages[1].node_options =
            OptionValues::from([("ruleId".to_string(), json!("does_not_exist"))]);
        let err = engine.validate_rule_config(&broken).unwrap_err();
        assert!(err.to_string().contains("unknown rule 'does_not_exist'"));

        let valid_set = RuleSetConfig {
            id: "extra".to_string(),
            name: "Extra".to_string(),
            entries: vec![RuleSetEntry {
                rule_id: "large_amount".to_string(),
                severity: Severity::Critical,
            }],
        };
        assert!(engine.validate_rule_set_config(&valid_set).is_ok());

        let mut missing = valid_set.clone();
        missing.entries[0].rule_id = "ghost".to_string();
        assert!(engine.validate_rule_set_config(&missing).is_err());
    }

    #[tokio::test]
    async fn test_replacement_is_rejected_when_stale_or_invalid() {
        let engine = fraud_engine().await;

        let err = engine
            .replace_active_config(EngineConfig::empty(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::StaleRevision { proposed: 1, active: 1 })
        ));

        let mut invalid = load_config("configs/invalid-rules.yaml").unwrap();
        invalid.revision = 9;
        let err = engine.replace_active_config(invalid).await.unwrap_err();
        assert_eq!(
            match err {
                EngineError::Config(ref e) => e.validation_errors().len(),
                _ => 0,
            },
            3
        );

        // the previous graph is still active
        assert_eq!(engine.active_config().revision, 1);
        assert!(engine.catalog().rule("large_amount").is_some());
    }

    #[tokio::test]
    async fn test_provider_bootstrap_and_save() {
        let config = load_config(FRAUD_RULES).unwrap();
        let provider = Arc::new(InMemoryConfigProvider::with_configs([config]));
        let engine = RuntimeBuilder::new()
            .with_provider(provider.clone())
            .build()
            .unwrap();

        assert_eq!(engine.load_latest().await.unwrap(), 1);
        assert_eq!(engine.catalog().rules().len(), 3);
        // nothing newer to install
        assert_eq!(engine.load_latest().await.unwrap(), 1);

        let mut next = engine.active_config();
        next.revision = 2;
        next.rule_sets.clear();
        engine.replace_active_config(next).await.unwrap();
        assert_eq!(provider.latest_revision().await.unwrap(), Some(2));
        assert!(engine.catalog().rule_sets().is_empty());
    }

    #[tokio::test]
    async fn test_load_latest_requires_a_provider() {
        let engine = RuntimeBuilder::new().build().unwrap();
        assert!(matches!(engine.load_latest().await, Err(EngineError::NoProvider)));
    }

    #[tokio::test]
    async fn test_events_follow_engine_activity() {
        let engine = RuntimeBuilder::new().build().unwrap();
        let mut events = engine.subscribe();

        let config = load_config(FRAUD_RULES).unwrap();
        engine.replace_active_config(config).await.unwrap();
        engine
            .execute_rule("large_amount", &json!({"amount": 5000, "currency": "EUR"}))
            .await
            .unwrap();
        let _ = engine.execute_rule("large_amount", &json!({"amount": [1]})).await;

        assert!(matches!(
            events.recv().await,
            Some(EngineEvent::ConfigReplaced {
                previous_revision: 0,
                revision: 1,
                rule_count: 3,
                rule_set_count: 1,
            })
        ));
        match events.recv().await {
            Some(EngineEvent::RuleExecuted { rule_id, triggered, .. }) => {
                assert_eq!(rule_id, "large_amount");
                assert!(triggered);
            }
            other => panic!("expected a rule execution, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await,
            Some(EngineEvent::ExecutionFailed { ref id, .. }) if id == "large_amount"
        ));
    }

    #[tokio::test]
    async fn test_export_serialized_nodes() {
        let engine = RuntimeBuilder::new().build().unwrap();

        let nodes = engine.export_serialized_nodes(&OptionValues::new());
        assert_eq!(nodes.len(), 8);
        assert_eq!(nodes[0].id, "entry");

        let entry = engine
            .export_serialized_node(
                "entry",
                &OptionValues::from([("fields".to_string(), json!({"amount": "NUMBER"}))]),
            )
            .unwrap();
        let entry = serde_json::to_value(entry).unwrap();
        assert_eq!(entry["role"], json!("ENTRY"));
        assert!(entry["inputs"]["amount"].is_object());

        assert!(matches!(
            engine.export_serialized_node("missing", &OptionValues::new()),
            Err(EngineError::UnknownNode(_))
        ));
    }
}
