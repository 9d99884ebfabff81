//! Orchestration tree (§4.6): a single-root `OrchestrationStep` of `Group`,
//! `Parallel`, `Router`, `AgentStep`, `Transform`, and `Handoff` variants.
//! Construction-time validation rejects cyclic blueprint references, empty
//! loops, and duplicate parallel branch names — grounded in the teacher's
//! `StateGraph::compile_internal` (visited-set DFS, duplicate/endpoint checks
//! before any execution is attempted).

pub mod handoff;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::agent::{AgentContext, AgentResult, AgentRuntime};
use crate::error::AgentError;
use crate::tool::CancellationToken;

pub use handoff::{Handoff, HandoffSpec};

pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;
pub type Reducer = Arc<dyn Fn(&[(String, String)]) -> String + Send + Sync>;

/// Error raised while validating an orchestration tree at construction time,
/// before any step has run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlueprintError {
    #[error("blueprint reference to unknown name: {0}")]
    UnknownReference(String),
    #[error("cyclic blueprint reference through: {0}")]
    Cyclic(String),
    #[error("empty loop: blueprint '{0}' references itself with no other step in the group")]
    EmptyLoop(String),
    #[error("parallel step has duplicate branch name: {0}")]
    DuplicateBranchName(String),
}

/// One node of the orchestration tree.
pub enum OrchestrationStep {
    /// Execute sequentially, feeding each output as the next input.
    Group(Vec<OrchestrationStep>),
    AgentStep(Arc<AgentRuntime>),
    /// Fan out concurrently; branch names must be unique.
    Parallel {
        branches: Vec<(String, OrchestrationStep)>,
        reducer: Option<Reducer>,
    },
    /// Evaluate branches in declaration order; first matching predicate wins.
    /// If none match, every `otherwise` step runs in declaration order as a group.
    Router {
        branches: Vec<(Predicate, OrchestrationStep)>,
        otherwise: Vec<OrchestrationStep>,
    },
    /// Pure synchronous input -> string mapping between steps.
    Transform(Transform),
    Handoff(HandoffSpec),
    /// Reference to a named blueprint, resolved against the registry passed
    /// to `execute`/`validate`. Enables recursive composition.
    BlueprintRef(String),
}

/// A named, registrable orchestration subtree.
pub struct Blueprint {
    pub name: String,
    pub root: OrchestrationStep,
}

#[derive(Default)]
pub struct BlueprintRegistry {
    blueprints: HashMap<String, OrchestrationStep>,
}

impl BlueprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, blueprint: Blueprint) {
        self.blueprints.insert(blueprint.name, blueprint.root);
    }
}

impl OrchestrationStep {
    /// Validates this step (and everything it transitively references)
    /// before it is ever run. Mirrors the teacher's construction-time
    /// compile checks: every reference resolves, no cycles, no empty loops,
    /// no duplicate parallel branch names.
    pub fn validate(&self, registry: &BlueprintRegistry) -> Result<(), BlueprintError> {
        self.validate_inner(registry, &mut HashSet::new())
    }

    fn validate_inner(&self, registry: &BlueprintRegistry, visiting: &mut HashSet<String>) -> Result<(), BlueprintError> {
        match self {
            OrchestrationStep::Group(steps) => {
                for step in steps {
                    step.validate_inner(registry, visiting)?;
                }
                Ok(())
            }
            OrchestrationStep::AgentStep(_) | OrchestrationStep::Transform(_) | OrchestrationStep::Handoff(_) => Ok(()),
            OrchestrationStep::Parallel { branches, .. } => {
                let mut seen = HashSet::new();
                for (name, step) in branches {
                    if !seen.insert(name.clone()) {
                        return Err(BlueprintError::DuplicateBranchName(name.clone()));
                    }
                    step.validate_inner(registry, visiting)?;
                }
                Ok(())
            }
            OrchestrationStep::Router { branches, otherwise } => {
                for (_, step) in branches {
                    step.validate_inner(registry, visiting)?;
                }
                for step in otherwise {
                    step.validate_inner(registry, visiting)?;
                }
                Ok(())
            }
            OrchestrationStep::BlueprintRef(name) => {
                if !visiting.insert(name.clone()) {
                    return Err(BlueprintError::Cyclic(name.clone()));
                }
                let target = registry
                    .blueprints
                    .get(name)
                    .ok_or_else(|| BlueprintError::UnknownReference(name.clone()))?;
                if matches!(target, OrchestrationStep::BlueprintRef(inner) if inner == name) {
                    return Err(BlueprintError::EmptyLoop(name.clone()));
                }
                let result = target.validate_inner(registry, visiting);
                visiting.remove(name);
                result
            }
        }
    }

    pub async fn execute(
        &self,
        input: &str,
        context: &mut AgentContext,
        registry: &BlueprintRegistry,
        cancellation: &CancellationToken,
    ) -> Result<AgentResult, AgentError> {
        match self {
            OrchestrationStep::Group(steps) => {
                let mut current_input = input.to_string();
                let mut last = empty_result();
                for (i, step) in steps.iter().enumerate() {
                    let result = Box::pin(step.execute(&current_input, context, registry, cancellation)).await?;
                    for (k, v) in &result.metadata {
                        context.shared.insert(format!("loop.step_{i}.{k}"), v.clone());
                        context.shared.insert(k.clone(), v.clone());
                    }
                    current_input = result.output.clone();
                    last = result;
                }
                Ok(last)
            }
            OrchestrationStep::AgentStep(agent) => {
                agent.run(AgentContext::new(input.to_string()), cancellation).await
            }
            OrchestrationStep::Parallel { branches, reducer } => {
                let futures = branches.iter().map(|(name, step)| {
                    let mut ctx = context.clone();
                    async move {
                        let result = Box::pin(step.execute(input, &mut ctx, registry, cancellation)).await;
                        (name.clone(), result)
                    }
                });
                let results = futures::future::join_all(futures).await;

                let mut outputs = Vec::with_capacity(results.len());
                let mut metadata = std::collections::BTreeMap::new();
                for (name, result) in results {
                    let result = result?;
                    metadata.insert(name.clone(), result.output.clone());
                    outputs.push((name, result.output.clone()));
                }
                let joined = if let Some(reducer) = reducer {
                    reducer(&outputs)
                } else {
                    join_outputs(&outputs)
                };
                let mut result = empty_result();
                result.output = joined;
                result.metadata = metadata;
                Ok(result)
            }
            OrchestrationStep::Router { branches, otherwise } => {
                for (predicate, step) in branches {
                    if predicate(input) {
                        return Box::pin(step.execute(input, context, registry, cancellation)).await;
                    }
                }
                let mut current_input = input.to_string();
                let mut last = empty_result();
                for (i, step) in otherwise.iter().enumerate() {
                    let result = Box::pin(step.execute(&current_input, context, registry, cancellation)).await?;
                    for (k, v) in &result.metadata {
                        context.shared.insert(format!("loop.step_{i}.{k}"), v.clone());
                        context.shared.insert(k.clone(), v.clone());
                    }
                    current_input = result.output.clone();
                    last = result;
                }
                Ok(last)
            }
            OrchestrationStep::Transform(f) => {
                let mut result = empty_result();
                result.output = f(input);
                Ok(result)
            }
            OrchestrationStep::Handoff(spec) => {
                let from = context.execution_trail.last().cloned().unwrap_or_else(|| "orchestration".to_string());
                spec.target.hooks.on_handoff(&from, spec.target.name()).await;
                spec.target.run(AgentContext::new(input.to_string()), cancellation).await
            }
            OrchestrationStep::BlueprintRef(name) => {
                let step = registry
                    .blueprints
                    .get(name)
                    .ok_or_else(|| AgentError::InvalidBlueprint(BlueprintError::UnknownReference(name.clone())))?;
                Box::pin(step.execute(input, context, registry, cancellation)).await
            }
        }
    }
}

fn empty_result() -> AgentResult {
    AgentResult {
        output: String::new(),
        tool_calls: Vec::new(),
        tool_results: Vec::new(),
        iteration_count: 0,
        duration: std::time::Duration::ZERO,
        token_usage: None,
        metadata: std::collections::BTreeMap::new(),
    }
}

/// Default output join for `Parallel` (SPEC_FULL §4.9): declaration order,
/// blank-line separated, `[branch]`-prefixed when more than one branch
/// produced non-empty output; a lone non-empty branch passes through bare.
fn join_outputs(outputs: &[(String, String)]) -> String {
    let non_empty: Vec<_> = outputs.iter().filter(|(_, out)| !out.is_empty()).collect();
    match non_empty.as_slice() {
        [] => String::new(),
        [(_, out)] => (*out).clone(),
        many => many
            .iter()
            .map(|(name, out)| format!("[{name}]\n{out}"))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}
