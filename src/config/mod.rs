// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod node_map;
mod parser;
mod provider;
mod runtime;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, EngineConfig, EngineOptions, InputBinding, RuleConfig,
    RuleSetConfig, RuleSetEntry, RuleStageConfig,
};
pub use node_map::NodeMap;
pub use parser::ConfigParser;
pub use provider::{ConfigProvider, InMemoryConfigProvider};
pub use runtime::RuntimeBuilder;
