// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Invokes another rule of the active catalog and republishes its EXIT output.

use async_trait::async_trait;
use serde_json::json;

use crate::engine::{ExecutionContext, Node, NodeMetadata, OptionDescriptor, OptionKind};
use crate::errors::ExecutionError;
use crate::nodes::result;
use crate::traits::{Executor, NodeHandler};
use crate::values::{Shape, TypedValue, ValueKind, ValueMap};

const SHOULD_EXECUTE: &str = "shouldExecute";

pub struct ExecuteRule;

fn conditional(ctx: &ExecutionContext) -> bool {
    ctx.option_bool("conditional").unwrap_or(false)
}

#[async_trait]
impl NodeHandler for ExecuteRule {
    /// Inputs mirror the target rule's ENTRY shape and outputs its EXIT shape.
    fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata {
        let target = ctx
            .option_str("ruleId")
            .and_then(|rule_id| ctx.catalog().rule(rule_id));

        let mut inputs = target.map(|rule| rule.input_shape(ctx)).unwrap_or_default();
        if conditional(ctx) {
            inputs = inputs.with(SHOULD_EXECUTE, ValueKind::BOOLEAN);
        }
        let outputs = target.map(|rule| rule.exit_shape(ctx)).unwrap_or_default();

        NodeMetadata::new(inputs, outputs)
            .with_option(OptionDescriptor::new("ruleId", OptionKind::Rule))
            .with_option(OptionDescriptor::new("conditional", OptionKind::Boolean).optional())
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let rule_id = ctx
            .option_str("ruleId")
            .ok_or_else(|| ExecutionError::node("missing option 'ruleId'"))?;

        // Skipped calls never reach the recursion check.
        let mut rule_inputs = inputs.clone();
        if conditional(ctx) {
            let should_execute = rule_inputs.remove(SHOULD_EXECUTE);
            if should_execute != Some(TypedValue::Boolean(true)) {
                return Ok(result(false));
            }
        }

        if ctx.rule_in_flight(rule_id) {
            let mut call_stack = ctx.rule_stack();
            call_stack.push(rule_id.to_string());
            return Err(ExecutionError::RecursiveRule {
                rule_id: rule_id.to_string(),
                call_stack,
            });
        }

        let rule = ctx
            .catalog()
            .rule(rule_id)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownRule(rule_id.to_string()))?;

        let invoked = rule.run(rule_inputs, ctx).await?;
        let mut outputs = invoked.outputs.exit;
        if ctx.is_preview() {
            let stages = invoked
                .outputs
                .stages
                .into_iter()
                .map(|(stage_id, stage)| (stage_id, TypedValue::Record(stage.outputs)))
                .collect();
            outputs.insert("stages".to_string(), TypedValue::Record(stages));
        }
        Ok(outputs)
    }
}

pub fn execute_rule() -> Node {
    Node::new("execute_rule", "Execute Rule", ExecuteRule)
        .with_description("Runs another rule and publishes its result")
        .with_default_option("conditional", json!(false))
}
