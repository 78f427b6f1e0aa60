// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{ExecutionContext, Node, NodeMetadata, OptionDescriptor, OptionKind};
use crate::errors::ExecutionError;
use crate::traits::NodeHandler;
use crate::values::{Shape, TypedValue, ValueKind, ValueMap};

/// Emits the literal in its `value` option as the kind named by `kind`.
pub struct StaticValue;

fn kind(ctx: &ExecutionContext) -> Option<ValueKind> {
    ctx.option_str("kind").and_then(ValueKind::from_id)
}

fn literal(kind: &ValueKind, native: &serde_json::Value) -> Result<TypedValue, String> {
    let value = kind.wrap(native)?;
    kind.validate(&value)?;
    Ok(value)
}

#[async_trait]
impl NodeHandler for StaticValue {
    fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata {
        let outputs = kind(ctx)
            .map(|kind| Shape::new().with("value", kind))
            .unwrap_or_default();

        NodeMetadata::new(Shape::new(), outputs)
            .with_option(
                OptionDescriptor::new("kind", OptionKind::Text).with_validator(|value, _| {
                    value
                        .as_str()
                        .and_then(ValueKind::from_id)
                        .map(|_| ())
                        .ok_or_else(|| format!("unknown value kind {}", value))
                }),
            )
            .with_option(
                OptionDescriptor::new("value", OptionKind::Json).with_validator(|value, ctx| {
                    match kind(ctx) {
                        Some(kind) => literal(&kind, value).map(|_| ()),
                        // reported against `kind`
                        None => Ok(()),
                    }
                }),
            )
    }

    async fn execute(
        &self,
        _inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let kind = kind(ctx).ok_or_else(|| ExecutionError::node("missing or unknown value kind"))?;
        let native = ctx
            .option("value")
            .ok_or_else(|| ExecutionError::node("missing option 'value'"))?;
        let value = literal(&kind, native).map_err(ExecutionError::node)?;
        Ok(ValueMap::from([("value".to_string(), value)]))
    }
}

pub fn static_value() -> Node {
    Node::new("static_value", "Static Value", StaticValue)
        .with_description("Emits a configured literal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Catalog, OptionValues};
    use crate::traits::Executor;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx(kind: &str, value: serde_json::Value) -> ExecutionContext {
        ExecutionContext::new(Arc::new(Catalog::default())).with_options(OptionValues::from([
            ("kind".to_string(), json!(kind)),
            ("value".to_string(), value),
        ]))
    }

    #[tokio::test]
    async fn test_emits_collection_literal() {
        let result = static_value()
            .run(ValueMap::new(), &ctx("STRING.COLLECTION", json!(["GB", "FR"])))
            .await
            .unwrap();
        assert_eq!(
            result.outputs.get("value"),
            Some(&TypedValue::List(vec![TypedValue::from("GB"), TypedValue::from("FR")]))
        );
    }

    #[test]
    fn test_value_must_fit_kind() {
        let node = static_value();
        let err = node
            .validate_context(&node.create_context(&ctx("NUMBER", json!("abc"))))
            .unwrap_err();
        assert!(err.contains("option 'value'"));

        let err = node
            .validate_context(&node.create_context(&ctx("MONEY", json!(1))))
            .unwrap_err();
        assert!(err.contains("unknown value kind"));
    }
}
