// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::config::InputBinding;
use crate::engine::context::ExecutionContext;
use crate::engine::node::{Node, NodeMetadata, NodeRole, OptionValues};
use crate::errors::ExecutionError;
use crate::traits::{ExecutionResult, Executor, ExecutorKind};
use crate::values::{insert_path, read_path, ValueMap};

/// Result of running one stage.
pub type StageResult = ExecutionResult<ValueMap, ValueMap>;

/// One placement of a node within a rule: option overrides plus input wiring.
pub struct RuleStage {
    id: String,
    node: Arc<Node>,
    options: OptionValues,
    inputs: Vec<InputBinding>,
}

impl RuleStage {
    pub fn new(
        id: impl Into<String>,
        node: Arc<Node>,
        options: OptionValues,
        inputs: Vec<InputBinding>,
    ) -> Self {
        Self {
            id: id.into(),
            node,
            options,
            inputs,
        }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// The stage's own option overrides, without node defaults.
    pub fn options(&self) -> &OptionValues {
        &self.options
    }

    pub fn inputs(&self) -> &[InputBinding] {
        &self.inputs
    }

    pub fn role(&self) -> NodeRole {
        self.node.role()
    }

    pub fn is_entry(&self) -> bool {
        self.role() == NodeRole::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.role() == NodeRole::Exit
    }

    pub fn merged_options(&self) -> OptionValues {
        self.node.merge_options(&self.options)
    }

    /// Context the bound node runs in: node defaults merged with this stage's overrides.
    pub fn create_node_context(&self, parent: &ExecutionContext) -> ExecutionContext {
        parent.with_node_options(self.merged_options(), &self.id)
    }

    pub fn metadata(&self, parent: &ExecutionContext) -> NodeMetadata {
        self.node.metadata(&self.create_node_context(parent))
    }

    /// Distinct ids of the stages this stage reads from.
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.inputs
            .iter()
            .map(|binding| binding.rule_stage_id.as_str())
            .collect()
    }

    /// Assemble this stage's inputs from the outputs of completed stages.
    ///
    /// Source outputs that were not produced are left out; the node's input validation
    /// reports them if they were required.
    pub fn resolve_inputs(
        &self,
        completed: &BTreeMap<String, StageResult>,
    ) -> Result<ValueMap, ExecutionError> {
        let mut inputs = ValueMap::new();
        for binding in &self.inputs {
            let source = completed.get(&binding.rule_stage_id).ok_or_else(|| {
                ExecutionError::InternalError {
                    message: format!(
                        "stage '{}' scheduled before its source stage '{}'",
                        self.id, binding.rule_stage_id
                    ),
                }
            })?;
            if let Some(value) = read_path(&source.outputs, &binding.output_id) {
                insert_path(&mut inputs, &binding.input_id, value.clone()).map_err(|reason| {
                    ExecutionError::UnresolvedInput {
                        stage_id: self.id.clone(),
                        input_id: binding.input_id.clone(),
                        reason,
                    }
                })?;
            }
        }
        Ok(inputs)
    }
}

impl fmt::Debug for RuleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleStage")
            .field("id", &self.id)
            .field("node", &self.node.id())
            .field("options", &self.options)
            .field("inputs", &self.inputs)
            .finish()
    }
}

#[async_trait]
impl Executor for RuleStage {
    type Inputs = ValueMap;
    type Outputs = ValueMap;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::RuleStage
    }

    fn validate_context(&self, ctx: &ExecutionContext) -> Result<(), String> {
        let mut reasons = Vec::new();

        let mut seen = BTreeSet::new();
        for binding in &self.inputs {
            if !seen.insert(binding.input_id.as_str()) {
                reasons.push(format!(
                    "multiple values to same input '{}'",
                    binding.input_id
                ));
            }
        }

        if self.is_entry() {
            if !self.inputs.is_empty() {
                reasons.push("entry stage cannot have inputs".to_string());
            }
        } else {
            let metadata = self.metadata(ctx);
            for binding in &self.inputs {
                if metadata.inputs.kind_at(&binding.input_id).is_none() {
                    reasons.push(format!("unknown input '{}'", binding.input_id));
                }
            }
            let bound: Vec<&str> = seen.into_iter().collect();
            for missing in metadata.inputs.unsatisfied(&bound) {
                reasons.push(format!("missing input '{}'", missing));
            }
        }

        let node_ctx = self.node.create_context(&self.create_node_context(ctx));
        if let Err(reason) = self.node.validate_context(&node_ctx) {
            reasons.push(format!("node '{}': {}", self.node.id(), reason));
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons.join("; "))
        }
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        let result = self
            .node
            .run(inputs.clone(), &self.create_node_context(ctx))
            .await?;
        Ok(result.outputs)
    }
}
