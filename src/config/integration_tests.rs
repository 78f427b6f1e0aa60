// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::consts::CONFIG_SCHEMA_VERSION;
    use crate::config::{
        load_and_validate_config, load_config, ConfigParser, EngineOptions, NodeMap, RuntimeBuilder,
    };
    use crate::engine::Severity;
    use crate::errors::{ConfigError, ValidationError};

    /// Test that the YAML fraud rules load and parse correctly
    #[test]
    fn test_fraud_rules_yaml_loading() {
        let config =
            load_and_validate_config("configs/fraud-rules.yaml", &NodeMap::builtin()).unwrap();

        assert_eq!(config.version, CONFIG_SCHEMA_VERSION);
        assert_eq!(config.revision, 1);
        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.rules[0].id, "large_amount");
        assert_eq!(config.rules[0].stages[2].node_id, "compare_numbers");
        assert_eq!(config.rules[0].stages[2].inputs[1].rule_stage_id, "limit");
        assert_eq!(config.rule_sets[0].entries[2].severity, Severity::High);
    }

    /// Test the JSON document decodes into the same structures
    #[test]
    fn test_json_document_loading() {
        let config =
            load_and_validate_config("configs/fraud-rules.json", &NodeMap::builtin()).unwrap();

        assert_eq!(config.revision, 2);
        assert_eq!(config.rules[0].id, "many_tags");
        assert!(config.rule_sets.is_empty());
    }

    /// Every problem in the document is reported at once
    #[test]
    fn test_invalid_document_reports_all_errors() {
        let config = load_config("configs/invalid-rules.yaml").unwrap();
        let err = ConfigParser::parse(&config, &NodeMap::builtin()).unwrap_err();

        let errors = err.validation_errors();
        assert_eq!(errors.len(), 3);
        assert!(matches!(
            errors[0],
            ValidationError::UnknownNode { ref node_id, .. } if node_id == "compare_dates"
        ));
        assert!(matches!(
            errors[1],
            ValidationError::CyclicDependency { ref rule_id, .. } if rule_id == "cycle"
        ));
        assert!(matches!(
            errors[2],
            ValidationError::UnknownRule { ref rule_id, .. } if rule_id == "missing_rule"
        ));

        let message = err.to_string();
        assert!(message.starts_with("Configuration validation failed"));
        assert!(message.contains("uses unknown node 'compare_dates'"));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        assert!(matches!(
            load_config("configs/does-not-exist.yaml"),
            Err(ConfigError::Io(_))
        ));
    }

    /// Export then re-parse of a loaded document is stable
    #[test]
    fn test_exported_document_reparses() {
        let nodes = NodeMap::builtin();
        let config = load_config("configs/fraud-rules.yaml").unwrap();
        let catalog = ConfigParser::parse(&config, &nodes).unwrap();

        let exported = ConfigParser::export_catalog(&catalog);
        let reparsed = ConfigParser::parse(&exported, &nodes).unwrap();
        assert_eq!(ConfigParser::export_catalog(&reparsed), exported);
        assert_eq!(exported.rule_sets, config.rule_sets);
    }

    #[tokio::test]
    async fn test_runtime_builder_installs_document() {
        let engine = RuntimeBuilder::new()
            .with_options(EngineOptions {
                max_concurrency: Some(2),
                ..EngineOptions::default()
            })
            .from_config_file("configs/fraud-rules.yaml")
            .await
            .unwrap();

        assert_eq!(engine.active_config().revision, 1);
        assert_eq!(engine.catalog().rules().len(), 3);
        assert!(engine.catalog().rule_set("payment_alerts").is_some());
    }
}
