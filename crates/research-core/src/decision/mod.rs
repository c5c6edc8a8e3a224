//! Per-step decisions: (plan, memory, page state) into exactly one [`Action`].

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::action::Action;
use crate::errors::AgentError;
use crate::memory::ResearchMemory;
use crate::observer::PageState;
use crate::plan::{ResearchPlan, SearchQuery};
use crate::ports::{GenerationRequest, StructuredGenerator};
use crate::utils::bounded;

pub use prompt::{build_decision_prompt, DECISION_SYSTEM_PROMPT};

pub const ACTION_SCHEMA_NAME: &str = "Action";

/// Everything the decision engine sees for one step.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub task: &'a str,
    pub plan: &'a ResearchPlan,
    pub plan_generation: u32,
    pub memory: &'a ResearchMemory,
    pub page: &'a PageState,
    pub step: u32,
    pub max_steps: u32,
    pub history_window: usize,
}

impl<'a> DecisionContext<'a> {
    /// Planned queries not yet executed under the current plan generation.
    pub fn pending_queries(&self) -> Vec<&'a SearchQuery> {
        let completed = self.memory.completed_searches();
        self.plan
            .search_queries
            .iter()
            .filter(|q| !completed.contains_in(&q.key(), self.plan_generation))
            .collect()
    }

    fn hints(&self) -> Map<String, Value> {
        let mut hints = Map::new();
        hints.insert("task".into(), json!(self.task));
        hints.insert("step".into(), json!(self.step));
        hints.insert("max_steps".into(), json!(self.max_steps));
        hints.insert("page_url".into(), json!(self.page.url));
        hints.insert("page_title".into(), json!(self.page.title));
        hints.insert("page_summary".into(), json!(self.page.content_summary));
        hints.insert(
            "is_search_results".into(),
            json!(self.page.is_search_results_page),
        );
        hints.insert(
            "links".into(),
            json!(self.page.links.iter().take(10).collect::<Vec<_>>()),
        );
        hints.insert("findings".into(), json!(self.memory.findings().len()));
        hints.insert("max_findings".into(), json!(self.memory.max_findings()));
        hints.insert("visited_urls".into(), json!(self.memory.visited_urls()));
        hints.insert(
            "pending_queries".into(),
            json!(self.pending_queries().len()),
        );
        hints.insert(
            "last_tool".into(),
            json!(self
                .memory
                .history()
                .last()
                .map(|entry| entry.action.tool_name())),
        );
        hints
    }
}

/// Chooses the next action. Implementations never fail.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide_next_action(&self, ctx: &DecisionContext<'_>) -> Action;
}

/// JSON Schema for the action union.
pub fn action_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(Action)).unwrap_or_default()
}

/// Terminal action used when the backend cannot produce a decision.
pub fn fallback_finish(memory: &ResearchMemory, reason: &str) -> Action {
    let findings = memory.findings();
    let mut summary = format!(
        "Research stopped early ({reason}). Collected {} finding(s) from {} completed search(es).",
        findings.len(),
        memory.completed_searches().len()
    );
    if !findings.is_empty() {
        let titles = findings
            .iter()
            .map(|f| f.title.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        summary.push_str(&format!(" Findings: {titles}."));
    }
    Action::FinishTask { summary }
}

/// Decision engine backed by a structured-generation model.
pub struct LlmDecisionEngine {
    generator: Arc<dyn StructuredGenerator>,
    timeout: Duration,
}

impl LlmDecisionEngine {
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

    /// Run the model call without the fail-safe.
    pub async fn try_decide(&self, ctx: &DecisionContext<'_>) -> Result<Action, AgentError> {
        let generation = GenerationRequest {
            schema_name: ACTION_SCHEMA_NAME.to_string(),
            schema: action_schema(),
            system: DECISION_SYSTEM_PROMPT.to_string(),
            prompt: build_decision_prompt(ctx),
            hints: ctx.hints(),
        };
        let value = bounded("action decision", self.timeout, self.generator.generate(generation)).await?;
        Action::from_value(value)
    }
}

#[async_trait]
impl DecisionEngine for LlmDecisionEngine {
    async fn decide_next_action(&self, ctx: &DecisionContext<'_>) -> Action {
        match self.try_decide(ctx).await {
            Ok(action) => {
                debug!(
                    target: "decision",
                    step = ctx.step,
                    tool = %action.tool_name(),
                    "decided next action"
                );
                action
            }
            Err(err) => {
                warn!(
                    target: "decision",
                    step = ctx.step,
                    model = self.generator.model_id(),
                    error = %err,
                    "decision failed, finishing with partial results"
                );
                fallback_finish(ctx.memory, "decision backend unavailable")
            }
        }
    }
}
