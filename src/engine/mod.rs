// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod catalog;
pub mod context;
pub mod events;
pub mod facade;
pub mod node;
pub mod rule;
pub mod rule_set;
pub mod stage;
#[cfg(test)]
pub mod integration_tests;

pub use catalog::Catalog;
pub use context::{ExecutionContext, Frame};
pub use events::{EngineEvent, EventBus, EventSubscriber};
pub use facade::{Engine, RuleSetResult};
pub use node::{
    parse_schema, Node, NodeMetadata, NodeRole, OptionDescriptor, OptionKind, OptionValues,
    SerializedNode,
};
pub use rule::{Rule, RuleOutcome};
pub use rule_set::{RuleResult, RuleSet, RuleSetOutcome, Severity};
pub use stage::{RuleStage, StageResult};
