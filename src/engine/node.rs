// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::context::ExecutionContext;
use crate::errors::ExecutionError;
use crate::traits::{Executor, ExecutorKind, NodeHandler};
use crate::values::{Shape, ValueKind, ValueMap};

/// Option values keyed by option name, as they appear in `nodeOptions`.
pub type OptionValues = BTreeMap<String, serde_json::Value>;

/// Extra check applied to an option value once its kind has been accepted.
pub type OptionValidator =
    Arc<dyn Fn(&serde_json::Value, &ExecutionContext) -> Result<(), String> + Send + Sync>;

/// Special position a node may take in a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeRole {
    /// Receives the rule's own inputs
    Entry,
    /// Produces the rule's `{result}` signal
    Exit,
    #[default]
    Ordinary,
}

/// What an option value must look like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    Text,
    Number,
    Boolean,
    Dropdown { choices: Vec<String> },
    /// Id of a rule known to the execution context
    Rule,
    /// Object mapping field names to value-kind ids
    Schema,
    /// Any JSON value
    Json,
}

impl OptionKind {
    pub fn dropdown<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptionKind::Dropdown {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    fn check(&self, value: &serde_json::Value, ctx: &ExecutionContext) -> Result<(), String> {
        match self {
            OptionKind::Text if value.is_string() => Ok(()),
            OptionKind::Number if value.is_number() => Ok(()),
            OptionKind::Boolean if value.is_boolean() => Ok(()),
            OptionKind::Json => Ok(()),
            OptionKind::Dropdown { choices } => match value.as_str() {
                Some(choice) if choices.iter().any(|c| c == choice) => Ok(()),
                _ => Err(format!(
                    "expected one of [{}], got {}",
                    choices.join(", "),
                    value
                )),
            },
            OptionKind::Rule => match value.as_str() {
                Some(rule_id) if ctx.catalog().rule(rule_id).is_some() => Ok(()),
                Some(rule_id) => Err(format!("unknown rule '{}'", rule_id)),
                None => Err(format!("expected a rule id, got {}", value)),
            },
            OptionKind::Schema => parse_schema(value).map(|_| ()),
            other => Err(format!("expected {:?}, got {}", other, value)),
        }
    }
}

/// Parse a `Schema` option (`{"amount": "NUMBER", "tags": "STRING.COLLECTION"}`) into a shape.
pub fn parse_schema(value: &serde_json::Value) -> Result<Shape, String> {
    let fields = value
        .as_object()
        .ok_or_else(|| format!("expected an object of field kinds, got {}", value))?;
    fields
        .iter()
        .map(|(field, kind_id)| {
            kind_id
                .as_str()
                .and_then(ValueKind::from_id)
                .map(|kind| (field.clone(), kind))
                .ok_or_else(|| format!("field '{}' has unknown kind {}", field, kind_id))
        })
        .collect()
}

/// A configurable option declared by a node.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: OptionKind,
    pub required: bool,
    #[serde(skip)]
    validator: Option<OptionValidator>,
}

impl OptionDescriptor {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            validator: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&serde_json::Value, &ExecutionContext) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn validate(
        &self,
        value: Option<&serde_json::Value>,
        ctx: &ExecutionContext,
    ) -> Result<(), String> {
        let value = match value {
            Some(value) => value,
            None if self.required => return Err("missing value".to_string()),
            None => return Ok(()),
        };
        self.kind.check(value, ctx)?;
        match &self.validator {
            Some(validator) => validator(value, ctx),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .finish()
    }
}

/// Options, inputs and outputs of a node as resolved for one context.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeMetadata {
    pub options: Vec<OptionDescriptor>,
    pub inputs: Shape,
    pub outputs: Shape,
}

impl NodeMetadata {
    pub fn new(inputs: Shape, outputs: Shape) -> Self {
        Self {
            options: Vec::new(),
            inputs,
            outputs,
        }
    }

    pub fn with_option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }
}

/// A registered unit of typed computation.
///
/// The node owns identity and defaults; the [`NodeHandler`] owns metadata and computation.
#[derive(Clone)]
pub struct Node {
    id: String,
    name: String,
    role: NodeRole,
    description: String,
    default_options: OptionValues,
    handler: Arc<dyn NodeHandler>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        handler: impl NodeHandler + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: NodeRole::Ordinary,
            description: String::new(),
            default_options: OptionValues::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default_option(
        mut self,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.default_options.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default_options(&self) -> &OptionValues {
        &self.default_options
    }

    /// `overrides` laid over this node's defaults.
    pub fn merge_options(&self, overrides: &OptionValues) -> OptionValues {
        let mut merged = self.default_options.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn metadata(&self, ctx: &ExecutionContext) -> NodeMetadata {
        self.handler.metadata(ctx)
    }

    /// Editor-facing description of this node with options resolved against `ctx`.
    pub fn serialize(&self, ctx: &ExecutionContext) -> SerializedNode {
        let ctx = ctx.with_options(self.merge_options(ctx.options()));
        let metadata = self.metadata(&ctx);
        SerializedNode {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
            description: self.description.clone(),
            default_options: self.default_options.clone(),
            options: metadata.options,
            inputs: metadata.inputs,
            outputs: metadata.outputs,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("default_options", &self.default_options)
            .finish()
    }
}

#[async_trait]
impl Executor for Node {
    type Inputs = ValueMap;
    type Outputs = ValueMap;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Node
    }

    fn create_context(&self, parent: &ExecutionContext) -> ExecutionContext {
        parent
            .enter(self.kind(), &self.id)
            .with_options(self.merge_options(parent.options()))
    }

    fn validate_context(&self, ctx: &ExecutionContext) -> Result<(), String> {
        let metadata = self.metadata(ctx);
        let mut reasons = Vec::new();

        for option in &metadata.options {
            if let Err(reason) = option.validate(ctx.option(&option.name), ctx) {
                reasons.push(format!("option '{}': {}", option.name, reason));
            }
        }
        for name in ctx.options().keys() {
            if !metadata.options.iter().any(|option| &option.name == name) {
                reasons.push(format!("unknown option '{}'", name));
            }
        }

        if self.role == NodeRole::Exit {
            let valid_exit = metadata.outputs.len() == 1
                && metadata
                    .outputs
                    .get("result")
                    .map(ValueKind::is_boolean_like)
                    .unwrap_or(false);
            if !valid_exit {
                reasons.push(
                    "exit node must output exactly one boolean-like 'result' field".to_string(),
                );
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons.join("; "))
        }
    }

    fn validate_inputs(&self, inputs: &ValueMap, ctx: &ExecutionContext) -> Result<(), String> {
        self.metadata(ctx)
            .inputs
            .validate(inputs)
            .map_err(|reasons| reasons.join("; "))
    }

    fn validate_outputs(&self, outputs: &ValueMap, ctx: &ExecutionContext) -> Result<(), String> {
        self.metadata(ctx)
            .outputs
            .validate(outputs)
            .map_err(|reasons| reasons.join("; "))
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutionError> {
        self.handler.execute(inputs, ctx).await
    }
}

/// A node's identity plus its resolved metadata, for external editors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    pub id: String,
    pub name: String,
    pub role: NodeRole,
    pub description: String,
    pub default_options: OptionValues,
    pub options: Vec<OptionDescriptor>,
    pub inputs: Shape,
    pub outputs: Shape,
}
