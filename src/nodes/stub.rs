// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only nodes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{ExecutionContext, Node, NodeMetadata, NodeRole};
use crate::errors::ExecutionError;
use crate::traits::NodeHandler;
use crate::values::{Shape, TypedValue, ValueKind, ValueMap};

/// A node that always fails.
pub struct FailingNode;

#[async_trait]
impl NodeHandler for FailingNode {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::default()
    }

    async fn execute(
        &self,
        _inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        Err(ExecutionError::node("stub node failure"))
    }
}

/// Declares a STRING `result` plus a second output, which no EXIT node may do.
pub struct BadExitNode;

#[async_trait]
impl NodeHandler for BadExitNode {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(
            Shape::new(),
            Shape::new()
                .with("result", ValueKind::STRING)
                .with("reason", ValueKind::STRING),
        )
    }

    async fn execute(
        &self,
        _inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        Ok(ValueMap::from([
            ("result".to_string(), TypedValue::from("yes")),
            ("reason".to_string(), TypedValue::from("stub")),
        ]))
    }
}

/// Typed ENTRY node for a payment: `amount` NUMBER and `currency` STRING.
pub struct TransactionEntry;

fn transaction_shape() -> Shape {
    Shape::new()
        .with("amount", ValueKind::NUMBER)
        .with("currency", ValueKind::STRING)
}

#[async_trait]
impl NodeHandler for TransactionEntry {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(transaction_shape(), transaction_shape())
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        Ok(inputs.clone())
    }
}

pub fn transaction_entry() -> Node {
    Node::new("transaction_entry", "Transaction Entry", TransactionEntry).with_role(NodeRole::Entry)
}

/// Sleeps, then reports `done`.
pub struct SlowNode {
    delay: Duration,
}

#[async_trait]
impl NodeHandler for SlowNode {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(Shape::new(), Shape::new().with("done", ValueKind::BOOLEAN))
    }

    async fn execute(
        &self,
        _inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        tokio::time::sleep(self.delay).await;
        Ok(ValueMap::from([("done".to_string(), TypedValue::Boolean(true))]))
    }
}

pub fn slow_node(delay: Duration) -> Node {
    Node::new("slow", "Slow", SlowNode { delay })
}

/// Counts how often it runs. Takes a BOOLEAN `after` so it can be placed behind another stage.
pub struct CountingNode {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl NodeHandler for CountingNode {
    fn metadata(&self, _ctx: &ExecutionContext) -> NodeMetadata {
        NodeMetadata::new(Shape::new().with("after", ValueKind::BOOLEAN), Shape::new())
    }

    async fn execute(
        &self,
        _inputs: &ValueMap,
        _ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(ValueMap::new())
    }
}

pub fn counting_node(runs: Arc<AtomicUsize>) -> Node {
    Node::new("counting", "Counting", CountingNode { runs })
}
