// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message is a small struct implementing `Display` for the human-readable line and
//! [`StructuredLog`] for emitting it with typed fields at the right level.
//!
//! # Organization
//!
//! * `engine` - config replacement and facade-level execution events
//! * `executor` - per-unit lifecycle of the executor contract
//! * `validation` - configuration validation outcomes
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_rulebook::observability::messages::engine::ConfigReplaced;
//! use the_rulebook::observability::messages::StructuredLog;
//!
//! let msg = ConfigReplaced {
//!     previous_revision: 3,
//!     revision: 4,
//!     rule_count: 12,
//!     rule_set_count: 2,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod engine;
pub mod executor;
pub mod validation;

/// A message that knows how to log itself with structured fields.
pub trait StructuredLog {
    /// Emit the message at its designated level.
    fn log(&self);

    /// A span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
