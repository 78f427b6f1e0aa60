// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::{ConfigError, ExecutionError};

/// Errors surfaced by the engine facade and its builder.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Unknown rule '{0}'")]
    UnknownRule(String),

    #[error("Unknown rule set '{0}'")]
    UnknownRuleSet(String),

    #[error("No config provider is configured")]
    NoProvider,
}
