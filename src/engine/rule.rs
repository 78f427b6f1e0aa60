// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::engine::context::ExecutionContext;
use crate::engine::stage::{RuleStage, StageResult};
use crate::errors::{ExecutionError, ValidationError};
use crate::observability::messages::engine::LevelComputationCompleted;
use crate::observability::messages::StructuredLog;
use crate::traits::{Executor, ExecutorKind};
use crate::values::{default_compatibility, CompatibilityFn, Shape, TypedValue, ValueMap};

/// What a rule produced: its EXIT output plus every stage's result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleOutcome {
    pub exit: ValueMap,
    pub stages: BTreeMap<String, StageResult>,
}

impl RuleOutcome {
    /// Whether the EXIT stage reported `result: true`.
    pub fn triggered(&self) -> bool {
        matches!(self.exit.get("result"), Some(TypedValue::Boolean(true)))
    }

    /// The EXIT output as plain JSON.
    pub fn exit_json(&self) -> serde_json::Value {
        TypedValue::Record(self.exit.clone()).to_json()
    }
}

/// A dependency-ordered graph of rule stages.
///
/// Stages are partitioned into levels at construction: level 0 holds every stage without input
/// bindings, level N every stage whose sources all sit in earlier levels. Executing a rule runs
/// each level's stages concurrently and finishes a level before starting the next.
pub struct Rule {
    id: String,
    name: String,
    stages: Vec<Arc<RuleStage>>,
    levels: Vec<Vec<Arc<RuleStage>>>,
    entry: Option<Arc<RuleStage>>,
    exit: Option<Arc<RuleStage>>,
    compatibility: CompatibilityFn,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        stages: Vec<RuleStage>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let stages: Vec<Arc<RuleStage>> = stages.into_iter().map(Arc::new).collect();

        let mut known = HashSet::new();
        for stage in &stages {
            if !known.insert(stage.id()) {
                return Err(ValidationError::DuplicateStageId {
                    rule_id: id.clone(),
                    stage_id: stage.id().to_string(),
                });
            }
        }
        for stage in &stages {
            let missing = stage.dependencies().into_iter().find(|dep| !known.contains(dep));
            if let Some(missing) = missing {
                return Err(ValidationError::UnresolvedStage {
                    rule_id: id.clone(),
                    stage_id: stage.id().to_string(),
                    missing_stage: missing.to_string(),
                });
            }
        }

        let entry = single_stage(&stages, RuleStage::is_entry).map_err(|stages| {
            ValidationError::MultipleEntryStages {
                rule_id: id.clone(),
                stages,
            }
        })?;
        let exit = single_stage(&stages, RuleStage::is_exit).map_err(|stages| {
            ValidationError::MultipleExitStages {
                rule_id: id.clone(),
                stages,
            }
        })?;

        let levels = compute_levels(&id, &stages)?;
        LevelComputationCompleted {
            rule_id: &id,
            stage_count: stages.len(),
            level_count: levels.len(),
        }
        .log();

        Ok(Self {
            id,
            name: name.into(),
            stages,
            levels,
            entry,
            exit,
            compatibility: default_compatibility,
        })
    }

    /// Replace the predicate deciding whether a source kind may feed a target input.
    pub fn with_compatibility(mut self, compatibility: CompatibilityFn) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages in declaration order.
    pub fn stages(&self) -> &[Arc<RuleStage>] {
        &self.stages
    }

    pub fn levels(&self) -> &[Vec<Arc<RuleStage>>] {
        &self.levels
    }

    pub fn entry_stage(&self) -> Option<&Arc<RuleStage>> {
        self.entry.as_ref()
    }

    pub fn exit_stage(&self) -> Option<&Arc<RuleStage>> {
        self.exit.as_ref()
    }

    /// Inputs the rule expects: the ENTRY node's input shape, or nothing.
    pub fn input_shape(&self, ctx: &ExecutionContext) -> Shape {
        self.entry
            .as_ref()
            .map(|stage| stage.metadata(ctx).inputs)
            .unwrap_or_default()
    }

    /// Outputs the rule publishes: the EXIT node's output shape, or nothing.
    pub fn exit_shape(&self, ctx: &ExecutionContext) -> Shape {
        self.exit
            .as_ref()
            .map(|stage| stage.metadata(ctx).outputs)
            .unwrap_or_default()
    }

    fn stage(&self, id: &str) -> Option<&Arc<RuleStage>> {
        self.stages.iter().find(|stage| stage.id() == id)
    }

    /// Check every binding's source output exists and can feed the target input.
    fn wiring_problems(&self, stage: &RuleStage, ctx: &ExecutionContext) -> Vec<String> {
        let target = stage.metadata(ctx);
        let mut problems = Vec::new();
        for binding in stage.inputs() {
            let Some(source_stage) = self.stage(&binding.rule_stage_id) else {
                continue;
            };
            let source = source_stage.metadata(ctx);
            let Some(source_kind) = source.outputs.kind_at(&binding.output_id) else {
                problems.push(format!(
                    "stage '{}' has no output '{}'",
                    binding.rule_stage_id, binding.output_id
                ));
                continue;
            };
            if let Some(target_kind) = target.inputs.kind_at(&binding.input_id) {
                if !(self.compatibility)(source_kind, target_kind) {
                    problems.push(format!(
                        "cannot wire {}.{} ({}) into '{}' ({})",
                        binding.rule_stage_id,
                        binding.output_id,
                        source_kind,
                        binding.input_id,
                        target_kind
                    ));
                }
            }
        }
        problems
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field(
                "levels",
                &self
                    .levels
                    .iter()
                    .map(|level| level.iter().map(|s| s.id()).collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The single stage matching `pred`, or the ids of every match when there is more than one.
fn single_stage(
    stages: &[Arc<RuleStage>],
    pred: fn(&RuleStage) -> bool,
) -> Result<Option<Arc<RuleStage>>, Vec<String>> {
    let matches: Vec<&Arc<RuleStage>> = stages.iter().filter(|stage| pred(stage)).collect();
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(Arc::clone(only))),
        many => Err(many.iter().map(|stage| stage.id().to_string()).collect()),
    }
}

/// Partition stages into topological levels using Kahn's algorithm.
///
/// Stages keep their declaration order within a level. Any stage left unplaced sits on, or
/// downstream of, a dependency cycle.
fn compute_levels(
    rule_id: &str,
    stages: &[Arc<RuleStage>],
) -> Result<Vec<Vec<Arc<RuleStage>>>, ValidationError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for stage in stages {
        let deps = stage.dependencies();
        in_degree.insert(stage.id(), deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(stage.id());
        }
    }

    let mut levels: Vec<Vec<Arc<RuleStage>>> = Vec::new();
    let mut placed = 0;
    let mut current: Vec<&str> = stages
        .iter()
        .map(|stage| stage.id())
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();

    while !current.is_empty() {
        placed += current.len();
        let mut next = HashSet::new();
        for id in &current {
            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.insert(*dependent);
                    }
                }
            }
        }
        levels.push(
            stages
                .iter()
                .filter(|stage| current.contains(&stage.id()))
                .cloned()
                .collect(),
        );
        current = stages
            .iter()
            .map(|stage| stage.id())
            .filter(|id| next.contains(id))
            .collect();
    }

    if placed != stages.len() {
        let unplaced = stages
            .iter()
            .filter(|stage| in_degree.get(stage.id()).copied().unwrap_or(0) > 0)
            .map(|stage| stage.id().to_string())
            .collect();
        return Err(ValidationError::CyclicDependency {
            rule_id: rule_id.to_string(),
            stages: unplaced,
        });
    }

    Ok(levels)
}

#[async_trait]
impl Executor for Rule {
    type Inputs = ValueMap;
    type Outputs = RuleOutcome;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Rule
    }

    fn validate_context(&self, ctx: &ExecutionContext) -> Result<(), String> {
        let mut invalid = Vec::new();
        let mut reasons = Vec::new();
        for stage in &self.stages {
            let mut problems = Vec::new();
            if let Err(reason) = stage.validate_context(&stage.create_context(ctx)) {
                problems.push(reason);
            }
            problems.extend(self.wiring_problems(stage, ctx));
            if !problems.is_empty() {
                invalid.push(stage.id().to_string());
                reasons.push(format!("{}: {}", stage.id(), problems.join("; ")));
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "invalid stages [{}]: {}",
                invalid.join(", "),
                reasons.join(" | ")
            ))
        }
    }

    fn validate_inputs(&self, inputs: &ValueMap, ctx: &ExecutionContext) -> Result<(), String> {
        let Some(entry) = &self.entry else {
            return Ok(());
        };
        let node_ctx = entry.node().create_context(&entry.create_node_context(ctx));
        entry.node().validate_inputs(inputs, &node_ctx)
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<RuleOutcome, ExecutionError> {
        let mut completed: BTreeMap<String, StageResult> = BTreeMap::new();

        for level in &self.levels {
            let semaphore = Arc::new(Semaphore::new(ctx.max_concurrency()));
            let mut tasks = Vec::with_capacity(level.len());

            for stage in level {
                let stage_inputs = if stage.is_entry() {
                    inputs.clone()
                } else {
                    stage.resolve_inputs(&completed)?
                };
                let stage_id = stage.id().to_string();
                let stage = Arc::clone(stage);
                let stage_ctx = ctx.clone();
                let semaphore = Arc::clone(&semaphore);

                let task = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        ExecutionError::InternalError {
                            message: format!(
                                "Failed to acquire semaphore permit for stage '{}': {}",
                                stage.id(),
                                e
                            ),
                        }
                    })?;
                    stage.run(stage_inputs, &stage_ctx).await
                });
                tasks.push((stage_id, task));
            }

            // First failure fails the level; stages already spawned run on detached.
            for (stage_id, task) in tasks {
                match task.await {
                    Ok(Ok(result)) => {
                        completed.insert(stage_id, result);
                    }
                    Ok(Err(e)) => return Err(e),
                    Err(join_error) => {
                        return Err(ExecutionError::InternalError {
                            message: format!(
                                "Task join error for stage '{}': {}",
                                stage_id, join_error
                            ),
                        })
                    }
                }
            }
        }

        let exit = self
            .exit
            .as_ref()
            .and_then(|stage| completed.get(stage.id()))
            .map(|result| result.outputs.clone())
            .unwrap_or_default();

        Ok(RuleOutcome {
            exit,
            stages: completed,
        })
    }
}
