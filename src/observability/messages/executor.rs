// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the executor contract.
//!
//! Every node, rule stage, rule and rule set emits these as it moves through validation and
//! execution. They are logged inside the unit's own span, so the span carries the call path.

use crate::observability::messages::StructuredLog;
use crate::traits::ExecutorKind;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Which validation hook rejected the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPhase {
    Context,
    Inputs,
    Outputs,
}

impl Display for ValidationPhase {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let phase = match self {
            ValidationPhase::Context => "context",
            ValidationPhase::Inputs => "inputs",
            ValidationPhase::Outputs => "outputs",
        };
        f.write_str(phase)
    }
}

/// Validation passed and execution is starting.
///
/// # Log Level
/// `debug!` - emitted for every unit of every execution
pub struct ExecutorStarted<'a> {
    pub kind: ExecutorKind,
    pub id: &'a str,
}

impl Display for ExecutorStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} '{}' execution started", self.kind, self.id)
    }
}

impl StructuredLog for ExecutorStarted<'_> {
    fn log(&self) {
        tracing::debug!(kind = %self.kind, id = self.id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("executor", span_name = name, kind = %self.kind, id = self.id)
    }
}

/// Execution and output validation completed.
///
/// # Log Level
/// `debug!` - emitted for every unit of every execution
pub struct ExecutorCompleted<'a> {
    pub kind: ExecutorKind,
    pub id: &'a str,
    pub duration: Duration,
}

impl Display for ExecutorCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' completed in {:?}",
            self.kind, self.id, self.duration
        )
    }
}

impl StructuredLog for ExecutorCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            kind = %self.kind,
            id = self.id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "executor_completed",
            span_name = name,
            kind = %self.kind,
            id = self.id,
            duration = ?self.duration,
        )
    }
}

/// A validation hook rejected the unit before or after execution.
///
/// # Log Level
/// `warn!` - the caller supplied something the unit cannot accept
///
/// # Example
/// ```
/// use the_rulebook::observability::messages::executor::{ExecutorValidationFailed, ValidationPhase};
/// use the_rulebook::traits::ExecutorKind;
///
/// let msg = ExecutorValidationFailed {
///     kind: ExecutorKind::RuleStage,
///     id: "is_large",
///     phase: ValidationPhase::Context,
///     reason: "multiple values to same input 'inputA'",
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "RuleStage 'is_large' rejected its context: multiple values to same input 'inputA'"
/// );
/// ```
pub struct ExecutorValidationFailed<'a> {
    pub kind: ExecutorKind,
    pub id: &'a str,
    pub phase: ValidationPhase,
    pub reason: &'a str,
}

impl Display for ExecutorValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' rejected its {}: {}",
            self.kind, self.id, self.phase, self.reason
        )
    }
}

impl StructuredLog for ExecutorValidationFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            kind = %self.kind,
            id = self.id,
            phase = %self.phase,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "executor_validation_failed",
            span_name = name,
            kind = %self.kind,
            id = self.id,
            phase = %self.phase,
        )
    }
}

/// The unit's `execute` returned an error.
///
/// # Log Level
/// `error!` - the failure is propagated, wrapped, to the caller
pub struct ExecutorFailed<'a> {
    pub kind: ExecutorKind,
    pub id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExecutorFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} '{}' failed: {}", self.kind, self.id, self.error)
    }
}

impl StructuredLog for ExecutorFailed<'_> {
    fn log(&self) {
        tracing::error!(
            kind = %self.kind,
            id = self.id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "executor_failed",
            span_name = name,
            kind = %self.kind,
            id = self.id,
            error = %self.error,
        )
    }
}
