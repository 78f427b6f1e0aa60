// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::Node;
use crate::errors::EngineError;
use crate::nodes::builtin_nodes;
use crate::traits::Executor;

/// Registry of the nodes available to rule stages, in registration order.
///
/// Node ids are unique across the registry.
#[derive(Clone, Default)]
pub struct NodeMap {
    nodes: Vec<Arc<Node>>,
    index: HashMap<String, usize>,
}

impl NodeMap {
    /// Create a new empty node map
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in nodes.
    pub fn builtin() -> Self {
        let mut map = Self::new();
        for node in builtin_nodes() {
            // built-in ids are distinct
            let _ = map.insert(node);
        }
        map
    }

    /// Built-ins followed by caller-defined nodes.
    pub fn with_custom(custom: impl IntoIterator<Item = Node>) -> Result<Self, EngineError> {
        let mut map = Self::builtin();
        for node in custom {
            map.insert(node)?;
        }
        Ok(map)
    }

    /// Register a node, rejecting an id that is already taken.
    pub fn insert(&mut self, node: Node) -> Result<(), EngineError> {
        let id = node.id().to_string();
        if self.index.contains_key(&id) {
            return Err(EngineError::DuplicateNodeId(id));
        }
        self.index.insert(id, self.nodes.len());
        self.nodes.push(Arc::new(node));
        Ok(())
    }

    /// Get a node by ID
    pub fn get(&self, id: &str) -> Option<&Arc<Node>> {
        self.index.get(id).and_then(|i| self.nodes.get(*i))
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Debug for NodeMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMap")
            .field("node_count", &self.nodes.len())
            .field(
                "node_ids",
                &self.nodes.iter().map(|node| node.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::stub::FailingNode;

    #[test]
    fn test_builtin_nodes_are_registered_in_order() {
        let map = NodeMap::builtin();
        let ids: Vec<&str> = map.iter().map(|node| node.id()).collect();

        assert_eq!(ids.first(), Some(&"entry"));
        assert!(map.contains_key("compare_numbers"));
        assert!(map.contains_key("execute_rule"));
        assert!(map.get("compare_dates").is_none());
    }

    #[test]
    fn test_duplicate_node_id_is_rejected() {
        let err =
            NodeMap::with_custom([Node::new("exit", "Shadow exit", FailingNode)]).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNodeId(ref id) if id == "exit"));
    }

    #[test]
    fn test_custom_nodes_follow_builtins() {
        let map = NodeMap::with_custom([Node::new("explode", "Explode", FailingNode)]).unwrap();
        assert_eq!(map.iter().last().map(|node| node.id()), Some("explode"));
        assert_eq!(map.len(), NodeMap::builtin().len() + 1);
    }
}
