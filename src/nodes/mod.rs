// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in nodes registered with every engine.

pub mod collection_size;
pub mod compare;
pub mod entry;
pub mod execute_rule;
pub mod exit;
pub mod static_value;

#[cfg(test)]
pub mod stub;

use crate::engine::Node;
use crate::errors::ExecutionError;
use crate::values::{TypedValue, ValueMap};

/// Every built-in node, in registration order.
pub fn builtin_nodes() -> Vec<Node> {
    vec![
        entry::entry_node(),
        exit::exit_node(),
        compare::compare_booleans(),
        compare::compare_numbers(),
        compare::compare_strings(),
        static_value::static_value(),
        collection_size::collection_size(),
        execute_rule::execute_rule(),
    ]
}

/// Single-field `{result: <bool>}` output shared by the predicate nodes.
pub(crate) fn result(value: bool) -> ValueMap {
    ValueMap::from([("result".to_string(), TypedValue::Boolean(value))])
}

pub(crate) fn input<'a>(
    inputs: &'a ValueMap,
    name: &str,
) -> Result<&'a TypedValue, ExecutionError> {
    inputs
        .get(name)
        .ok_or_else(|| ExecutionError::node(format!("missing input '{}'", name)))
}
