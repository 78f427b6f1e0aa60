// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration validation.
//!
//! This module contains message types for logging events related to:
//! * Structural checks (duplicate ids, unknown nodes, dependency cycles)
//! * Semantic checks over the assembled rule graph
//! * Overall validation outcome

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Validation of a configuration document is starting.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ValidationStarted {
    pub revision: u64,
    pub rule_count: usize,
    pub rule_set_count: usize,
}

impl Display for ValidationStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validating config revision {}: {} rules, {} rule sets",
            self.revision, self.rule_count, self.rule_set_count
        )
    }
}

impl StructuredLog for ValidationStarted {
    fn log(&self) {
        tracing::debug!(
            revision = self.revision,
            rule_count = self.rule_count,
            rule_set_count = self.rule_set_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "validation",
            span_name = name,
            revision = self.revision,
            rule_count = self.rule_count,
            rule_set_count = self.rule_set_count,
        )
    }
}

/// Validation finished without problems.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ValidationCompleted {
    pub revision: u64,
    pub duration: Duration,
}

impl Display for ValidationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Config revision {} validated in {:?}",
            self.revision, self.duration
        )
    }
}

impl StructuredLog for ValidationCompleted {
    fn log(&self) {
        tracing::debug!(
            revision = self.revision,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "validation_completed",
            span_name = name,
            revision = self.revision,
            duration = ?self.duration,
        )
    }
}

/// Validation found one or more problems; nothing is installed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_rulebook::observability::messages::validation::ValidationFailed;
///
/// let msg = ValidationFailed { revision: 7, error_count: 2 };
/// assert_eq!(msg.to_string(), "Config revision 7 failed validation with 2 errors");
/// ```
pub struct ValidationFailed {
    pub revision: u64,
    pub error_count: usize,
}

impl Display for ValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Config revision {} failed validation with {} errors",
            self.revision, self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed {
    fn log(&self) {
        tracing::error!(
            revision = self.revision,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "validation_failed",
            span_name = name,
            revision = self.revision,
            error_count = self.error_count,
        )
    }
}

/// One problem found during validation.
///
/// # Log Level
/// `warn!` - reported individually before the aggregate failure
pub struct ValidationProblem<'a> {
    pub error: &'a dyn std::error::Error,
}

impl Display for ValidationProblem<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Validation problem: {}", self.error)
    }
}

impl StructuredLog for ValidationProblem<'_> {
    fn log(&self) {
        tracing::warn!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("validation_problem", span_name = name, error = %self.error)
    }
}
