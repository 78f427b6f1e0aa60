// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{ExecutionContext, NodeMetadata};
use crate::errors::ExecutionError;
use crate::values::ValueMap;

/// The computation behind a [`Node`](crate::engine::Node).
///
/// Handlers are stateless: `execute` must not mutate `self`, its inputs or anything shared.
/// Metadata is always resolved from the context so options can reshape inputs and outputs;
/// handlers with a fixed shape simply ignore the argument.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata;

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError>;
}
