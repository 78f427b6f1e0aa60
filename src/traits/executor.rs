// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::Instrument;

use crate::engine::ExecutionContext;
use crate::errors::ExecutionError;
use crate::observability::messages::executor::{
    ExecutorCompleted, ExecutorFailed, ExecutorStarted, ExecutorValidationFailed, ValidationPhase,
};
use crate::observability::messages::StructuredLog;

/// The four layers that share the executor contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExecutorKind {
    Node,
    RuleStage,
    Rule,
    RuleSet,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutorKind::Node => "Node",
            ExecutorKind::RuleStage => "RuleStage",
            ExecutorKind::Rule => "Rule",
            ExecutorKind::RuleSet => "RuleSet",
        };
        f.write_str(name)
    }
}

/// Envelope returned by [`Executor::run`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult<I, O> {
    pub execution_time_ms: f64,
    pub inputs: I,
    pub outputs: O,
}

/// Contract shared by nodes, rule stages, rules and rule sets.
///
/// Implementors override the three validation hooks and [`execute`](Executor::execute). Callers
/// go through [`run`](Executor::run), which drives the fixed sequence:
///
/// 1. derive a child context (`create_context`)
/// 2. `validate_context`
/// 3. `validate_inputs`
/// 4. timed `execute`, wrapping any failure with this unit's kind and id
/// 5. `validate_outputs`
///
/// A failed validation aborts before anything executes.
#[async_trait]
pub trait Executor: Send + Sync {
    type Inputs: Clone + Send + Sync + 'static;
    type Outputs: Send + Sync + 'static;

    fn id(&self) -> &str;

    fn kind(&self) -> ExecutorKind;

    fn create_context(&self, parent: &ExecutionContext) -> ExecutionContext {
        parent.enter(self.kind(), self.id())
    }

    fn validate_context(&self, _ctx: &ExecutionContext) -> Result<(), String> {
        Ok(())
    }

    fn validate_inputs(
        &self,
        _inputs: &Self::Inputs,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        Ok(())
    }

    fn validate_outputs(
        &self,
        _outputs: &Self::Outputs,
        _ctx: &ExecutionContext,
    ) -> Result<(), String> {
        Ok(())
    }

    async fn execute(
        &self,
        inputs: &Self::Inputs,
        ctx: &ExecutionContext,
    ) -> Result<Self::Outputs, ExecutionError>;

    async fn run(
        &self,
        inputs: Self::Inputs,
        parent: &ExecutionContext,
    ) -> Result<ExecutionResult<Self::Inputs, Self::Outputs>, ExecutionError> {
        let kind = self.kind();
        let id = self.id().to_string();
        let ctx = self.create_context(parent);

        ctx.span().in_scope(|| {
            if let Err(reason) = self.validate_context(&ctx) {
                validation_failed(kind, &id, ValidationPhase::Context, &reason);
                return Err(ExecutionError::InvalidContext {
                    kind,
                    id: id.clone(),
                    reason,
                });
            }
            if let Err(reason) = self.validate_inputs(&inputs, &ctx) {
                validation_failed(kind, &id, ValidationPhase::Inputs, &reason);
                return Err(ExecutionError::InvalidInputs {
                    kind,
                    id: id.clone(),
                    reason,
                });
            }
            ExecutorStarted { kind, id: &id }.log();
            Ok(())
        })?;

        let start = Instant::now();
        let outputs = match self
            .execute(&inputs, &ctx)
            .instrument(ctx.span().clone())
            .await
        {
            Ok(outputs) => outputs,
            Err(e) => {
                ctx.span()
                    .in_scope(|| ExecutorFailed { kind, id: &id, error: &e }.log());
                return Err(e.within(kind, id));
            }
        };
        let elapsed = start.elapsed();

        ctx.span().in_scope(|| {
            if let Err(reason) = self.validate_outputs(&outputs, &ctx) {
                validation_failed(kind, &id, ValidationPhase::Outputs, &reason);
                return Err(ExecutionError::InvalidOutputs {
                    kind,
                    id: id.clone(),
                    reason,
                });
            }
            ExecutorCompleted {
                kind,
                id: &id,
                duration: elapsed,
            }
            .log();
            Ok(())
        })?;

        Ok(ExecutionResult {
            execution_time_ms: elapsed.as_secs_f64() * 1000.0,
            inputs,
            outputs,
        })
    }
}

fn validation_failed(kind: ExecutorKind, id: &str, phase: ValidationPhase, reason: &str) {
    ExecutorValidationFailed {
        kind,
        id,
        phase,
        reason,
    }
    .log();
}
