// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime failures raised by the executor contract.
//!
//! Validation failures name the unit that rejected its context, inputs or outputs. Failures
//! raised while executing are wrapped in [`ExecutionError::Failed`] once per layer
//! (node, stage, rule, rule set) so the final error reads as an annotated chain.

use thiserror::Error;

use crate::traits::ExecutorKind;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{kind} '{id}' has an invalid context: {reason}")]
    InvalidContext {
        kind: ExecutorKind,
        id: String,
        reason: String,
    },

    #[error("{kind} '{id}' received invalid inputs: {reason}")]
    InvalidInputs {
        kind: ExecutorKind,
        id: String,
        reason: String,
    },

    #[error("{kind} '{id}' produced invalid outputs: {reason}")]
    InvalidOutputs {
        kind: ExecutorKind,
        id: String,
        reason: String,
    },

    /// A child failure annotated with the unit that was executing it
    #[error("{kind} '{id}' failed: {source}")]
    Failed {
        kind: ExecutorKind,
        id: String,
        #[source]
        source: Box<ExecutionError>,
    },

    /// Raised by a node's own computation
    #[error("{0}")]
    NodeFailed(String),

    #[error("recursive rule cycle detected: {}", .call_stack.join(" -> "))]
    RecursiveRule {
        rule_id: String,
        call_stack: Vec<String>,
    },

    #[error("Unknown rule '{0}'")]
    UnknownRule(String),

    #[error("Stage '{stage_id}' could not assemble input '{input_id}': {reason}")]
    UnresolvedInput {
        stage_id: String,
        input_id: String,
        reason: String,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ExecutionError {
    pub fn node(reason: impl Into<String>) -> Self {
        ExecutionError::NodeFailed(reason.into())
    }

    /// Wrap `self` with the identity of the unit it surfaced through.
    pub fn within(self, kind: ExecutorKind, id: impl Into<String>) -> Self {
        ExecutionError::Failed {
            kind,
            id: id.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any `Failed` annotations.
    pub fn root_cause(&self) -> &ExecutionError {
        match self {
            ExecutionError::Failed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_chain_reads_outer_to_inner() {
        let err = ExecutionError::node("division by zero")
            .within(ExecutorKind::Node, "divide")
            .within(ExecutorKind::RuleStage, "ratio")
            .within(ExecutorKind::Rule, "credit-check");

        assert_eq!(
            err.to_string(),
            "Rule 'credit-check' failed: RuleStage 'ratio' failed: Node 'divide' failed: division by zero"
        );
        assert!(matches!(err.root_cause(), ExecutionError::NodeFailed(_)));
    }

    #[test]
    fn test_recursive_rule_message() {
        let err = ExecutionError::RecursiveRule {
            rule_id: "a".into(),
            call_stack: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "recursive rule cycle detected: a -> b -> a");
    }
}
