// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;

use crate::engine::{ExecutionContext, Node, NodeMetadata, OptionDescriptor, OptionKind};
use crate::errors::ExecutionError;
use crate::nodes::input;
use crate::traits::NodeHandler;
use crate::values::{Shape, TypedValue, ValueKind, ValueMap};

/// Reports the number of entries in its `collection` input.
pub struct CollectionSize;

#[async_trait]
impl NodeHandler for CollectionSize {
    fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata {
        let inputs = ctx
            .option_str("entryKind")
            .and_then(ValueKind::from_id)
            .map(|entry| Shape::new().with("collection", ValueKind::collection_of(entry)))
            .unwrap_or_default();

        NodeMetadata::new(inputs, Shape::new().with("size", ValueKind::NUMBER)).with_option(
            OptionDescriptor::new("entryKind", OptionKind::Text).with_validator(|value, _| {
                value
                    .as_str()
                    .and_then(ValueKind::from_id)
                    .map(|_| ())
                    .ok_or_else(|| format!("unknown value kind {}", value))
            }),
        )
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let entries = input(inputs, "collection")?
            .as_list()
            .ok_or_else(|| ExecutionError::node("input 'collection' is not a collection"))?;
        Ok(ValueMap::from([(
            "size".to_string(),
            TypedValue::Number(entries.len() as f64),
        )]))
    }
}

pub fn collection_size() -> Node {
    Node::new("collection_size", "Collection Size", CollectionSize)
        .with_description("Counts the entries of a collection")
        .with_default_option("entryKind", json!("STRING"))
}
