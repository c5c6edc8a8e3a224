//! Research planning: one structured model call per plan generation.

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::action::SearchEngine;
use crate::errors::AgentError;
use crate::memory::{CompletedSearch, Finding};
use crate::orchestrator::config::PerformanceMode;
use crate::plan::ResearchPlan;
use crate::ports::{GenerationRequest, StructuredGenerator};
use crate::utils::bounded;

pub use prompt::{build_plan_prompt, PLANNER_SYSTEM_PROMPT};

pub const PLAN_SCHEMA_NAME: &str = "ResearchPlan";

/// Context carried into a replan call.
#[derive(Debug, Clone)]
pub struct PriorContext {
    pub previous_plan: ResearchPlan,
    pub reason: String,
    pub findings: Vec<Finding>,
    pub completed_searches: Vec<CompletedSearch>,
    pub scratchpad_tail: String,
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub task: String,
    pub start_url: Option<String>,
    pub max_findings: usize,
    pub mode: PerformanceMode,
    pub default_engine: SearchEngine,
    pub prior: Option<PriorContext>,
}

impl PlanRequest {
    pub fn is_replan(&self) -> bool {
        self.prior.is_some()
    }

    fn hints(&self) -> Map<String, Value> {
        let mut hints = Map::new();
        hints.insert("task".into(), json!(self.task));
        hints.insert("max_findings".into(), json!(self.max_findings));
        hints.insert("default_engine".into(), json!(self.default_engine));
        if let Some(prior) = self.prior.as_ref() {
            hints.insert("replan_reason".into(), json!(prior.reason));
            hints.insert(
                "completed_queries".into(),
                json!(prior
                    .completed_searches
                    .iter()
                    .map(|s| s.query.clone())
                    .collect::<Vec<_>>()),
            );
        }
        hints
    }
}

/// Turns a task into a [`ResearchPlan`]. Implementations never fail.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn create_plan(&self, request: &PlanRequest) -> ResearchPlan;
}

/// JSON Schema handed to the backend for plan generation.
pub fn plan_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(ResearchPlan)).unwrap_or_default()
}

/// Planner backed by a structured-generation model, with a deterministic fallback.
pub struct LlmPlanner {
    generator: Arc<dyn StructuredGenerator>,
    timeout: Duration,
}

impl LlmPlanner {
    pub fn new(generator: Arc<dyn StructuredGenerator>) -> Self {
        Self {
            generator,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the model call without the fallback.
    pub async fn try_create_plan(&self, request: &PlanRequest) -> Result<ResearchPlan, AgentError> {
        let generation = GenerationRequest {
            schema_name: PLAN_SCHEMA_NAME.to_string(),
            schema: plan_schema(),
            system: PLANNER_SYSTEM_PROMPT.to_string(),
            prompt: build_plan_prompt(request),
            hints: request.hints(),
        };
        let value = bounded("plan generation", self.timeout, self.generator.generate(generation)).await?;
        let plan: ResearchPlan = serde_json::from_value(value)
            .map_err(|err| AgentError::invalid_plan(format!("malformed plan: {err}")))?;
        plan.validated()
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn create_plan(&self, request: &PlanRequest) -> ResearchPlan {
        match self.try_create_plan(request).await {
            Ok(plan) => {
                info!(
                    target: "planner",
                    model = self.generator.model_id(),
                    queries = plan.search_queries.len(),
                    depth = plan.depth.as_str(),
                    replan = request.is_replan(),
                    "plan created"
                );
                plan
            }
            Err(err) => {
                warn!(
                    target: "planner",
                    model = self.generator.model_id(),
                    error = %err,
                    "plan generation failed, using fallback plan"
                );
                ResearchPlan::fallback(&request.task, request.default_engine, request.max_findings)
            }
        }
    }
}
