// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // documents, parser, providers, builder
pub mod engine;     // nodes, stages, rules, rule sets and the facade
pub mod errors;     // error handling
pub mod nodes;      // built-in nodes
pub mod observability;
pub mod traits;     // unified abstractions
pub mod values;     // typed value system
