// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display` implementation so log lines
//! are defined once, next to the fields they carry, instead of as format strings scattered
//! through the engine.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - config replacement and facade-level execution events
//! * `messages::executor` - validation and execution of individual units
//! * `messages::validation` - configuration validation outcomes
//!
//! Every executor layer runs inside its own span (see
//! [`ExecutionContext::span`](crate::engine::ExecutionContext::span)), so these messages are
//! recorded against the full rule set / rule / stage / node path.

pub mod messages;
