// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Predicate nodes comparing two (or, for `BETWEEN`, three) inputs of one primitive kind.
//!
//! The `operation` dropdown selects the comparison; every node outputs `{result: BOOLEAN}`.

use async_trait::async_trait;
use serde_json::json;

use crate::engine::{ExecutionContext, Node, NodeMetadata, OptionDescriptor, OptionKind};
use crate::errors::ExecutionError;
use crate::nodes::{input, result};
use crate::traits::NodeHandler;
use crate::values::{Shape, ValueKind, ValueMap};

const BOOLEAN_OPERATIONS: [&str; 5] = ["EQUAL", "NOT_EQUAL", "AND", "OR", "XOR"];
const NUMBER_OPERATIONS: [&str; 7] = [
    "EQUAL",
    "NOT_EQUAL",
    "GREATER",
    "GREATER_EQUAL",
    "LESS",
    "LESS_EQUAL",
    "BETWEEN",
];
const STRING_OPERATIONS: [&str; 5] = ["EQUAL", "NOT_EQUAL", "CONTAINS", "STARTS_WITH", "ENDS_WITH"];

fn operation(ctx: &ExecutionContext) -> &str {
    ctx.option_str("operation").unwrap_or_default()
}

fn unsupported(operation: &str) -> ExecutionError {
    ExecutionError::node(format!("unsupported operation '{}'", operation))
}

fn pair_shape(kind: ValueKind) -> Shape {
    Shape::new().with("inputA", kind.clone()).with("inputB", kind)
}

fn result_shape() -> Shape {
    Shape::new().with("result", ValueKind::BOOLEAN)
}

fn operation_option(choices: &[&str]) -> OptionDescriptor {
    OptionDescriptor::new("operation", OptionKind::dropdown(choices.iter().copied()))
}

fn boolean(inputs: &ValueMap, name: &str) -> Result<bool, ExecutionError> {
    input(inputs, name)?
        .as_bool()
        .ok_or_else(|| ExecutionError::node(format!("input '{}' is not a boolean", name)))
}

fn number(inputs: &ValueMap, name: &str) -> Result<f64, ExecutionError> {
    input(inputs, name)?
        .as_f64()
        .ok_or_else(|| ExecutionError::node(format!("input '{}' is not a number", name)))
}

fn string<'a>(inputs: &'a ValueMap, name: &str) -> Result<&'a str, ExecutionError> {
    input(inputs, name)?
        .as_str()
        .ok_or_else(|| ExecutionError::node(format!("input '{}' is not a string", name)))
}

pub struct CompareBooleans;

#[async_trait]
impl NodeHandler for CompareBooleans {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(pair_shape(ValueKind::BOOLEAN), result_shape())
            .with_option(operation_option(&BOOLEAN_OPERATIONS))
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let a = boolean(inputs, "inputA")?;
        let b = boolean(inputs, "inputB")?;
        let outcome = match operation(ctx) {
            "EQUAL" => a == b,
            "NOT_EQUAL" => a != b,
            "AND" => a && b,
            "OR" => a || b,
            "XOR" => a ^ b,
            other => return Err(unsupported(other)),
        };
        Ok(result(outcome))
    }
}

pub struct CompareNumbers;

#[async_trait]
impl NodeHandler for CompareNumbers {
    fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata {
        let mut inputs = pair_shape(ValueKind::NUMBER);
        if operation(ctx) == "BETWEEN" {
            inputs = inputs.with("inputC", ValueKind::NUMBER);
        }
        NodeMetadata::new(inputs, result_shape()).with_option(operation_option(&NUMBER_OPERATIONS))
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let a = number(inputs, "inputA")?;
        let b = number(inputs, "inputB")?;
        let outcome = match operation(ctx) {
            "EQUAL" => a == b,
            "NOT_EQUAL" => a != b,
            "GREATER" => a > b,
            "GREATER_EQUAL" => a >= b,
            "LESS" => a < b,
            "LESS_EQUAL" => a <= b,
            // inclusive on both ends
            "BETWEEN" => {
                let c = number(inputs, "inputC")?;
                b <= a && a <= c
            }
            other => return Err(unsupported(other)),
        };
        Ok(result(outcome))
    }
}

pub struct CompareStrings;

#[async_trait]
impl NodeHandler for CompareStrings {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(pair_shape(ValueKind::STRING), result_shape())
            .with_option(operation_option(&STRING_OPERATIONS))
            .with_option(OptionDescriptor::new("caseSensitive", OptionKind::Boolean).optional())
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let (a, b) = if ctx.option_bool("caseSensitive").unwrap_or(true) {
            (
                string(inputs, "inputA")?.to_string(),
                string(inputs, "inputB")?.to_string(),
            )
        } else {
            (
                string(inputs, "inputA")?.to_lowercase(),
                string(inputs, "inputB")?.to_lowercase(),
            )
        };
        let outcome = match operation(ctx) {
            "EQUAL" => a == b,
            "NOT_EQUAL" => a != b,
            "CONTAINS" => a.contains(&b),
            "STARTS_WITH" => a.starts_with(&b),
            "ENDS_WITH" => a.ends_with(&b),
            other => return Err(unsupported(other)),
        };
        Ok(result(outcome))
    }
}

pub fn compare_booleans() -> Node {
    Node::new("compare_booleans", "Compare Booleans", CompareBooleans)
        .with_description("Combines two booleans")
        .with_default_option("operation", json!("EQUAL"))
}

pub fn compare_numbers() -> Node {
    Node::new("compare_numbers", "Compare Numbers", CompareNumbers)
        .with_description("Compares two numbers, or checks one lies within an inclusive range")
        .with_default_option("operation", json!("EQUAL"))
}

pub fn compare_strings() -> Node {
    Node::new("compare_strings", "Compare Strings", CompareStrings)
        .with_description("Compares two strings")
        .with_default_option("operation", json!("EQUAL"))
        .with_default_option("caseSensitive", json!(true))
}
