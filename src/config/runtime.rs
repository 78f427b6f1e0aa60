// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;
use std::sync::Arc;

use crate::config::loader::{load_config, EngineOptions};
use crate::config::node_map::NodeMap;
use crate::config::provider::ConfigProvider;
use crate::engine::{Engine, EventBus, Node};
use crate::errors::EngineError;

/// Engine builder - assembles the node registry, provider and event bus into an [`Engine`].
///
/// # Examples
///
/// ```
/// use the_rulebook::config::RuntimeBuilder;
///
/// let engine = RuntimeBuilder::new().build().unwrap();
/// assert_eq!(engine.active_config().revision, 0);
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    custom_nodes: Vec<Node>,
    provider: Option<Arc<dyn ConfigProvider>>,
    events: Option<Arc<EventBus>>,
    options: EngineOptions,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a caller-defined node alongside the built-ins.
    pub fn with_node(mut self, node: Node) -> Self {
        self.custom_nodes.push(node);
        self
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.custom_nodes.extend(nodes);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share an existing event bus instead of creating one.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let nodes = NodeMap::with_custom(self.custom_nodes)?;
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(EventBus::new(self.options.event_capacity)));
        Ok(Engine::new(nodes, self.provider, events, self.options))
    }

    /// Build an engine and install the configuration document at `path`.
    pub async fn from_config_file<P: AsRef<Path>>(self, path: P) -> Result<Engine, EngineError> {
        let config = load_config(path)?;
        let engine = self.build()?;
        engine.replace_active_config(config).await?;
        Ok(engine)
    }
}
