// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for engine lifecycle and execution events.
//!
//! This module contains message types for logging events related to:
//! * Active configuration replacement
//! * Rule level computation
//! * Rule and rule set execution through the facade

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A new configuration revision became active.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConfigReplaced {
    pub previous_revision: u64,
    pub revision: u64,
    pub rule_count: usize,
    pub rule_set_count: usize,
}

impl Display for ConfigReplaced {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Active config replaced: revision {} -> {} ({} rules, {} rule sets)",
            self.previous_revision, self.revision, self.rule_count, self.rule_set_count
        )
    }
}

impl StructuredLog for ConfigReplaced {
    fn log(&self) {
        tracing::info!(
            previous_revision = self.previous_revision,
            revision = self.revision,
            rule_count = self.rule_count,
            rule_set_count = self.rule_set_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "config_replaced",
            span_name = name,
            revision = self.revision,
            rule_count = self.rule_count,
        )
    }
}

/// A proposed configuration was rejected because its revision does not move forward.
///
/// # Log Level
/// `warn!` - caller error, active config is unchanged
pub struct StaleRevisionRejected {
    pub proposed: u64,
    pub active: u64,
}

impl Display for StaleRevisionRejected {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected config revision {}: active revision is {}",
            self.proposed, self.active
        )
    }
}

impl StructuredLog for StaleRevisionRejected {
    fn log(&self) {
        tracing::warn!(proposed = self.proposed, active = self.active, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stale_revision_rejected",
            span_name = name,
            proposed = self.proposed,
            active = self.active,
        )
    }
}

/// Topological levels computed for a rule.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct LevelComputationCompleted<'a> {
    pub rule_id: &'a str,
    pub stage_count: usize,
    pub level_count: usize,
}

impl Display for LevelComputationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rule '{}': {} stages sorted into {} levels",
            self.rule_id, self.stage_count, self.level_count
        )
    }
}

impl StructuredLog for LevelComputationCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            rule_id = self.rule_id,
            stage_count = self.stage_count,
            level_count = self.level_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "level_computation",
            span_name = name,
            rule_id = self.rule_id,
            level_count = self.level_count,
        )
    }
}

/// A rule finished executing through the facade.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RuleExecutionCompleted<'a> {
    pub rule_id: &'a str,
    pub triggered: bool,
    pub duration: Duration,
}

impl Display for RuleExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rule '{}' executed in {:?}: triggered={}",
            self.rule_id, self.duration, self.triggered
        )
    }
}

impl StructuredLog for RuleExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            rule_id = self.rule_id,
            triggered = self.triggered,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "rule_execution",
            span_name = name,
            rule_id = self.rule_id,
            triggered = self.triggered,
        )
    }
}

/// A rule set finished executing through the facade.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RuleSetExecutionCompleted<'a> {
    pub rule_set_id: &'a str,
    pub severity: &'a str,
    pub triggered_rule: Option<&'a str>,
    pub duration: Duration,
}

impl Display for RuleSetExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.triggered_rule {
            Some(rule_id) => write!(
                f,
                "Rule set '{}' executed in {:?}: severity {} from rule '{}'",
                self.rule_set_id, self.duration, self.severity, rule_id
            ),
            None => write!(
                f,
                "Rule set '{}' executed in {:?}: no rule triggered",
                self.rule_set_id, self.duration
            ),
        }
    }
}

impl StructuredLog for RuleSetExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            rule_set_id = self.rule_set_id,
            severity = self.severity,
            triggered_rule = self.triggered_rule,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "rule_set_execution",
            span_name = name,
            rule_set_id = self.rule_set_id,
            severity = self.severity,
        )
    }
}

/// A facade-level execution failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_rulebook::observability::messages::engine::ExecutionFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
/// let msg = ExecutionFailed {
///     target: "rule",
///     id: "credit-check",
///     error: &error,
/// };
///
/// assert_eq!(msg.to_string(), "Execution of rule 'credit-check' failed: boom");
/// ```
pub struct ExecutionFailed<'a> {
    pub target: &'a str,
    pub id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution of {} '{}' failed: {}",
            self.target, self.id, self.error
        )
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            target_kind = self.target,
            id = self.id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "execution_failed",
            span_name = name,
            target_kind = self.target,
            id = self.id,
        )
    }
}
