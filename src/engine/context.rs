// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::sync::Arc;
use tracing::Span;
use uuid::Uuid;

use crate::engine::catalog::Catalog;
use crate::engine::node::OptionValues;
use crate::observability::messages::executor::ExecutorStarted;
use crate::observability::messages::StructuredLog;
use crate::traits::ExecutorKind;

/// One in-flight executor on the call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub kind: ExecutorKind,
    pub id: String,
}

/// Read-only state shared by one execution.
///
/// Contexts are never mutated in place: each executor layer derives a child with
/// [`enter`](ExecutionContext::enter), which pushes a call-stack frame and opens a child span.
/// Cloning is cheap; the rule catalog is shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    execution_id: Uuid,
    span: Span,
    catalog: Arc<Catalog>,
    preview: bool,
    max_concurrency: usize,
    call_stack: Vec<Frame>,
    options: OptionValues,
    stage_id: Option<String>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let execution_id = Uuid::new_v4();
        Self {
            execution_id,
            span: tracing::info_span!("execution", execution_id = %execution_id),
            catalog,
            preview: false,
            max_concurrency: default_concurrency(),
            call_stack: Vec::new(),
            options: OptionValues::new(),
            stage_id: None,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Child context for an executor about to run beneath this one.
    pub fn enter(&self, kind: ExecutorKind, id: &str) -> Self {
        let mut child = self.clone();
        child.span = self
            .span
            .in_scope(|| ExecutorStarted { kind, id }.span("executor_scope"));
        child.call_stack.push(Frame {
            kind,
            id: id.to_string(),
        });
        child
    }

    /// Child context carrying the merged options of the stage about to run its node.
    pub fn with_node_options(&self, options: OptionValues, stage_id: &str) -> Self {
        let mut child = self.clone();
        child.options = options;
        child.stage_id = Some(stage_id.to_string());
        child
    }

    /// Replace the option values, keeping everything else.
    pub fn with_options(&self, options: OptionValues) -> Self {
        let mut child = self.clone();
        child.options = options;
        child
    }

    /// Whether `rule_id` is already executing further up the call stack.
    pub fn rule_in_flight(&self, rule_id: &str) -> bool {
        self.call_stack
            .iter()
            .any(|frame| frame.kind == ExecutorKind::Rule && frame.id == rule_id)
    }

    /// Ids of the rules currently executing, outermost first.
    pub fn rule_stack(&self) -> Vec<String> {
        self.call_stack
            .iter()
            .filter(|frame| frame.kind == ExecutorKind::Rule)
            .map(|frame| frame.id.clone())
            .collect()
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn call_stack(&self) -> &[Frame] {
        &self.call_stack
    }

    pub fn options(&self) -> &OptionValues {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&serde_json::Value> {
        self.options.get(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(serde_json::Value::as_str)
    }

    pub fn option_bool(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(serde_json::Value::as_bool)
    }

    /// Id of the stage whose node is executing, if any.
    pub fn stage_id(&self) -> Option<&str> {
        self.stage_id.as_deref()
    }
}

/// Number of CPU cores, falling back to 4.
pub(crate) fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_does_not_touch_parent() {
        let root = ExecutionContext::new(Arc::new(Catalog::default()));
        let rule = root.enter(ExecutorKind::Rule, "outer");
        let stage = rule.enter(ExecutorKind::RuleStage, "check");

        assert!(root.call_stack().is_empty());
        assert_eq!(rule.call_stack().len(), 1);
        assert_eq!(stage.call_stack().len(), 2);
        assert_eq!(stage.execution_id(), root.execution_id());
    }

    #[test]
    fn test_enter_opens_an_executor_span() {
        // Spans are disabled without a subscriber; install one scoped to this test.
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let root = ExecutionContext::new(Arc::new(Catalog::default()));
            let rule = root.enter(ExecutorKind::Rule, "outer");

            let metadata = rule.span().metadata().expect("span metadata");
            assert_eq!(metadata.name(), "executor");
            assert!(metadata.fields().field("kind").is_some());
            assert!(metadata.fields().field("id").is_some());
        });
    }

    #[test]
    fn test_rule_in_flight_only_matches_rule_frames() {
        let ctx = ExecutionContext::new(Arc::new(Catalog::default()))
            .enter(ExecutorKind::Rule, "a")
            .enter(ExecutorKind::RuleStage, "b");

        assert!(ctx.rule_in_flight("a"));
        assert!(!ctx.rule_in_flight("b"));
        assert_eq!(ctx.rule_stack(), vec!["a".to_string()]);
    }

    #[test]
    fn test_max_concurrency_is_at_least_one() {
        let ctx = ExecutionContext::new(Arc::new(Catalog::default())).with_max_concurrency(0);
        assert_eq!(ctx.max_concurrency(), 1);
    }
}
