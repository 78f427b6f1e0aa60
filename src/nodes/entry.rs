// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;

use crate::engine::{
    parse_schema, ExecutionContext, Node, NodeMetadata, NodeRole, OptionDescriptor, OptionKind,
};
use crate::errors::ExecutionError;
use crate::traits::NodeHandler;
use crate::values::{Shape, ValueMap};

/// Receives a rule's inputs and republishes them, shaped by the `fields` option.
pub struct EntryNode;

fn fields(ctx: &ExecutionContext) -> Shape {
    ctx.option("fields")
        .and_then(|value| parse_schema(value).ok())
        .unwrap_or_default()
}

#[async_trait]
impl NodeHandler for EntryNode {
    fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata {
        let shape = fields(ctx);
        NodeMetadata::new(shape.clone(), shape)
            .with_option(OptionDescriptor::new("fields", OptionKind::Schema))
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let shape = fields(ctx);
        Ok(inputs
            .iter()
            .filter(|(name, _)| shape.get(name).is_some())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }
}

pub fn entry_node() -> Node {
    Node::new("entry", "Entry", EntryNode)
        .with_role(NodeRole::Entry)
        .with_description("Receives the rule inputs declared by the `fields` option")
        .with_default_option("fields", json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Catalog, OptionValues};
    use crate::traits::Executor;
    use crate::values::{TypedValue, ValueKind};
    use std::sync::Arc;

    fn ctx(fields: serde_json::Value) -> ExecutionContext {
        ExecutionContext::new(Arc::new(Catalog::default()))
            .with_options(OptionValues::from([("fields".to_string(), fields)]))
    }

    #[test]
    fn test_fields_option_shapes_inputs_and_outputs() {
        let metadata =
            entry_node().metadata(&ctx(json!({"amount": "NUMBER", "tags": "STRING.COLLECTION"})));
        assert_eq!(metadata.inputs.get("amount"), Some(&ValueKind::NUMBER));
        assert_eq!(metadata.outputs.len(), 2);
    }

    #[tokio::test]
    async fn test_passes_declared_fields_through() {
        let inputs = ValueMap::from([
            ("amount".to_string(), TypedValue::Number(12.0)),
            ("note".to_string(), TypedValue::from("ignored")),
        ]);
        let result = entry_node().run(inputs, &ctx(json!({"amount": "NUMBER"}))).await.unwrap();
        assert_eq!(result.outputs.len(), 1);
        assert_eq!(result.outputs.get("amount"), Some(&TypedValue::Number(12.0)));
    }

    #[test]
    fn test_unknown_kind_in_fields_is_rejected() {
        let node = entry_node();
        let err = node
            .validate_context(&node.create_context(&ctx(json!({"when": "DATE"}))))
            .unwrap_err();
        assert!(err.contains("option 'fields'"));
    }
}
