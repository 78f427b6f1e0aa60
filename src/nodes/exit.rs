// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{ExecutionContext, Node, NodeMetadata, NodeRole};
use crate::errors::ExecutionError;
use crate::nodes::{input, result};
use crate::traits::NodeHandler;
use crate::values::{Shape, TypedValue, ValueKind, ValueMap};

/// Terminal node publishing the rule's `result` signal.
pub struct ExitNode;

#[async_trait]
impl NodeHandler for ExitNode {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(
            Shape::new().with("result", ValueKind::BOOLEAN),
            Shape::new().with("result", ValueKind::BOOLEAN),
        )
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        match input(inputs, "result")? {
            TypedValue::Boolean(value) => Ok(result(*value)),
            other => Err(ExecutionError::node(format!(
                "expected a boolean result, got {}",
                other.type_name()
            ))),
        }
    }
}

pub fn exit_node() -> Node {
    Node::new("exit", "Exit", ExitNode)
        .with_role(NodeRole::Exit)
        .with_description("Publishes whether the rule triggered")
}
