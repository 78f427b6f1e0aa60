// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod node;

pub use executor::{ExecutionResult, Executor, ExecutorKind};
pub use node::NodeHandler;
