//! Research orchestrator: plan, then step through plan-driven searches and
//! model decisions until the task finishes or the budget runs out.

pub mod config;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::Action;
use crate::decision::{DecisionContext, DecisionEngine, LlmDecisionEngine};
use crate::errors::AgentError;
use crate::executor::{is_failure, ActionExecutor};
use crate::memory::{ActionHistoryEntry, Finding, ResearchMemory};
use crate::observer::{ObserveOptions, PageObserver};
use crate::plan::{ResearchPlan, SearchKey, SearchQuery};
use crate::planner::{LlmPlanner, PlanRequest, Planner, PriorContext};
use crate::ports::{BrowserDriver, PageAnalyzer, StructuredGenerator};

pub use config::{ModeProfile, PerformanceMode, ResearchConfig};

pub const MAX_STEPS_REACHED: &str = "Max steps reached";
const REPLAN_SCRATCHPAD_CHARS: usize = 600;

/// Input for one research run.
#[derive(Clone, Default)]
pub struct ResearchRequest {
    pub task: String,
    pub start_url: Option<String>,
    pub max_steps: Option<u32>,
    pub performance_mode: Option<PerformanceMode>,
    pub max_findings: Option<usize>,
    pub model: Option<Arc<dyn StructuredGenerator>>,
}

impl ResearchRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: Arc<dyn StructuredGenerator>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    pub fn with_max_steps(mut self, steps: u32) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_max_findings(mut self, findings: usize) -> Self {
        self.max_findings = Some(findings);
        self
    }

    pub fn with_mode(mut self, mode: PerformanceMode) -> Self {
        self.performance_mode = Some(mode);
        self
    }
}

impl std::fmt::Debug for ResearchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchRequest")
            .field("task", &self.task)
            .field("start_url", &self.start_url)
            .field("max_steps", &self.max_steps)
            .field("performance_mode", &self.performance_mode)
            .field("max_findings", &self.max_findings)
            .field("model", &self.model.as_ref().map(|m| m.model_id().to_string()))
            .finish()
    }
}

/// Result of a research run. Partial data is kept on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOutcome {
    pub run_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub findings: Vec<Finding>,
    pub history: Vec<ActionHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ResearchPlan>,
    pub steps_taken: u32,
    pub replans_used: u32,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Stepping,
    Replanning,
    Terminated,
}

/// Progress notifications streamed while a run is in flight.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResearchEvent {
    PlanReady {
        generation: u32,
        plan: ResearchPlan,
    },
    StepStarted {
        step: u32,
        max_steps: u32,
    },
    ActionExecuted {
        step: u32,
        action: Action,
        ok: bool,
        planned: bool,
    },
    FindingSaved {
        step: u32,
        finding: Finding,
        total: usize,
    },
    Replanned {
        generation: u32,
        reason: String,
    },
    Finished {
        success: bool,
        steps_taken: u32,
        message: String,
    },
}

enum LoopExit {
    Finished(String),
    AutoFinished(String),
    Exhausted,
}

struct RunSettings {
    task: String,
    start_url: Option<String>,
    max_steps: u32,
    max_findings: usize,
    mode: PerformanceMode,
}

/// Run-scoped state: browser session, page cache and memory.
struct RunContext {
    browser: Box<dyn BrowserDriver>,
    observer: PageObserver,
    memory: ResearchMemory,
    plan: Option<ResearchPlan>,
    plan_generation: u32,
    replans_used: u32,
    current_search_index: usize,
    phase: RunPhase,
    steps_taken: u32,
}

impl RunContext {
    /// Next planned query not yet completed in the current generation.
    fn next_planned_query(&mut self) -> Option<SearchQuery> {
        let plan = self.plan.as_ref()?;
        while self.current_search_index < plan.search_queries.len() {
            let query = &plan.search_queries[self.current_search_index];
            self.current_search_index += 1;
            if !self
                .memory
                .completed_searches()
                .contains_in(&query.key(), self.plan_generation)
            {
                return Some(query.clone());
            }
        }
        None
    }

    /// Whether every planned query ran under the current generation.
    fn planned_searches_done(&self) -> bool {
        let Some(plan) = self.plan.as_ref() else {
            return false;
        };
        let completed = self.memory.completed_searches();
        completed.count_in(self.plan_generation) >= plan.search_queries.len()
            || plan
                .search_queries
                .iter()
                .all(|q| completed.contains_in(&q.key(), self.plan_generation))
    }
}

/// Drives one research task end to end.
pub struct ResearchAgent {
    config: ResearchConfig,
    analyzer: Option<Arc<dyn PageAnalyzer>>,
    planner: Option<Arc<dyn Planner>>,
    decision_engine: Option<Arc<dyn DecisionEngine>>,
    events: Option<UnboundedSender<ResearchEvent>>,
}

impl ResearchAgent {
    pub fn new(config: ResearchConfig) -> Self {
        Self {
            config,
            analyzer: None,
            planner: None,
            decision_engine: None,
            events: None,
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn PageAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Replace the model-backed planner.
    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Replace the model-backed decision engine.
    pub fn with_decision_engine(mut self, engine: Arc<dyn DecisionEngine>) -> Self {
        self.decision_engine = Some(engine);
        self
    }

    pub fn with_events(mut self, sender: UnboundedSender<ResearchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Run a research task.
    ///
    /// Returns `Err` only when the request itself is invalid; in that case the
    /// browser is never touched. Every other failure is reported through
    /// [`ResearchOutcome`], and the browser session is closed before returning.
    pub async fn run(
        &self,
        request: ResearchRequest,
        browser: Box<dyn BrowserDriver>,
    ) -> Result<ResearchOutcome, AgentError> {
        let task = request.task.trim().to_string();
        if task.is_empty() {
            return Err(AgentError::invalid_request("task must not be empty"));
        }
        let model = request
            .model
            .clone()
            .ok_or_else(|| AgentError::invalid_request("a structured-generation model is required"))?;

        let settings = RunSettings {
            task,
            start_url: request
                .start_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            max_steps: request.max_steps.unwrap_or(self.config.max_steps),
            max_findings: request
                .max_findings
                .unwrap_or(self.config.max_findings)
                .max(1),
            mode: request
                .performance_mode
                .unwrap_or(self.config.performance_mode),
        };
        let model_timeout = Duration::from_millis(self.config.model_timeout_ms);
        let planner: Arc<dyn Planner> = match self.planner.clone() {
            Some(planner) => planner,
            None => Arc::new(LlmPlanner::new(model.clone()).with_timeout(model_timeout)),
        };
        let decision: Arc<dyn DecisionEngine> = match self.decision_engine.clone() {
            Some(engine) => engine,
            None => Arc::new(LlmDecisionEngine::new(model.clone()).with_timeout(model_timeout)),
        };
        let executor = ActionExecutor::new(
            Duration::from_millis(self.config.navigation_timeout_ms),
            Duration::from_millis(self.config.browser_timeout_ms),
        );

        let run_id = Uuid::new_v4().to_string();
        info!(
            target: "orchestrator",
            run_id = %run_id,
            task = %settings.task,
            model = model.model_id(),
            max_steps = settings.max_steps,
            max_findings = settings.max_findings,
            mode = settings.mode.as_str(),
            "research run started"
        );

        let started = Instant::now();
        let mut ctx = RunContext {
            browser,
            observer: PageObserver::new(
                self.analyzer.clone(),
                Duration::from_millis(self.config.browser_timeout_ms),
            ),
            memory: ResearchMemory::new(settings.max_findings),
            plan: None,
            plan_generation: 0,
            replans_used: 0,
            current_search_index: 0,
            phase: RunPhase::Planning,
            steps_taken: 0,
        };

        let exit = self
            .drive(&mut ctx, &settings, planner.as_ref(), decision.as_ref(), &executor)
            .await;
        ctx.phase = RunPhase::Terminated;

        if let Err(err) = ctx.browser.close().await {
            warn!(target: "orchestrator", error = %err, "failed to close browser session");
        }

        let (success, result, error) = match exit {
            Ok(LoopExit::Finished(summary)) | Ok(LoopExit::AutoFinished(summary)) => {
                (true, Some(summary), None)
            }
            Ok(LoopExit::Exhausted) => (false, None, Some(MAX_STEPS_REACHED.to_string())),
            Err(err) => (false, None, Some(err.to_string())),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            target: "orchestrator",
            success,
            steps = ctx.steps_taken,
            findings = ctx.memory.findings().len(),
            replans = ctx.replans_used,
            elapsed_ms,
            run_id = %run_id,
            "research run finished"
        );
        self.emit(ResearchEvent::Finished {
            success,
            steps_taken: ctx.steps_taken,
            message: result.clone().or_else(|| error.clone()).unwrap_or_default(),
        });

        let RunContext {
            memory,
            plan,
            replans_used,
            steps_taken,
            ..
        } = ctx;
        let (findings, history) = memory.into_parts();
        Ok(ResearchOutcome {
            run_id,
            success,
            result,
            error,
            findings,
            history,
            plan,
            steps_taken,
            replans_used,
            elapsed_ms,
        })
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        settings: &RunSettings,
        planner: &dyn Planner,
        decision: &dyn DecisionEngine,
        executor: &ActionExecutor,
    ) -> Result<LoopExit, AgentError> {
        let plan = planner
            .create_plan(&PlanRequest {
                task: settings.task.clone(),
                start_url: settings.start_url.clone(),
                max_findings: settings.max_findings,
                mode: settings.mode,
                default_engine: self.config.default_engine,
                prior: None,
            })
            .await;
        ctx.memory.note(format!("Plan: {}", plan.condensed()));
        self.emit(ResearchEvent::PlanReady {
            generation: 0,
            plan: plan.clone(),
        });
        ctx.plan = Some(plan);

        if let Some(url) = settings.start_url.as_deref() {
            let result = executor
                .execute(
                    ctx.browser.as_ref(),
                    &mut ctx.memory,
                    &Action::GoToPage {
                        url: url.to_string(),
                    },
                )
                .await;
            ctx.memory.visit(url);
            if is_failure(&result) {
                warn!(target: "orchestrator", url, result = %result, "start url navigation failed");
            }
        }

        ctx.phase = RunPhase::Stepping;
        for step in 1..=settings.max_steps {
            ctx.steps_taken = step;
            debug!(target: "orchestrator", step, phase = ?ctx.phase, "step started");
            self.emit(ResearchEvent::StepStarted {
                step,
                max_steps: settings.max_steps,
            });
            if let Some(exit) = self
                .step(ctx, settings, step, planner, decision, executor)
                .await?
            {
                return Ok(exit);
            }
            if let Some(summary) = self.auto_finish(ctx) {
                info!(target: "orchestrator", step, "finding target reached, finishing");
                return Ok(LoopExit::AutoFinished(summary));
            }
        }
        warn!(target: "orchestrator", max_steps = settings.max_steps, "step budget exhausted");
        Ok(LoopExit::Exhausted)
    }

    async fn step(
        &self,
        ctx: &mut RunContext,
        settings: &RunSettings,
        step: u32,
        planner: &dyn Planner,
        decision: &dyn DecisionEngine,
        executor: &ActionExecutor,
    ) -> Result<Option<LoopExit>, AgentError> {
        if self.config.is_search_step(step) {
            if let Some(query) = ctx.next_planned_query() {
                let action = Action::PerformSearch {
                    query: query.query.clone(),
                    engine: query.engine,
                };
                debug!(target: "orchestrator", step, query = %query.query, "plan-driven search");
                let result = executor
                    .execute(ctx.browser.as_ref(), &mut ctx.memory, &action)
                    .await;
                self.record(ctx, step, action, result, true);
                if self.config.search_settle_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.search_settle_ms)).await;
                }
                return Ok(None);
            }
        }

        let deep = self.config.is_analysis_step(step, settings.mode);
        let page = ctx
            .observer
            .observe(ctx.browser.as_ref(), ObserveOptions::for_mode(settings.mode, deep))
            .await;
        if !page.is_placeholder() {
            ctx.memory.visit(page.url.clone());
        }

        let plan = ctx
            .plan
            .as_ref()
            .ok_or_else(|| AgentError::invalid_plan("no active plan"))?;
        let action = decision
            .decide_next_action(&DecisionContext {
                task: &settings.task,
                plan,
                plan_generation: ctx.plan_generation,
                memory: &ctx.memory,
                page: &page,
                step,
                max_steps: settings.max_steps,
                history_window: self.config.history_window,
            })
            .await;
        info!(target: "orchestrator", step, action = %action.describe(), "executing action");

        let result = executor
            .execute(ctx.browser.as_ref(), &mut ctx.memory, &action)
            .await;
        self.record(ctx, step, action.clone(), result, false);
        if !action.is_control() {
            return Ok(None);
        }

        match action {
            Action::Replan { reason } => {
                self.replan(ctx, settings, planner, reason).await;
                Ok(None)
            }
            Action::FinishTask { summary } => {
                let summary = if summary.trim().is_empty() {
                    synthesize_summary(&ctx.memory)
                } else {
                    summary
                };
                Ok(Some(LoopExit::Finished(summary)))
            }
            _ => Ok(None),
        }
    }

    /// Append history and apply memory side effects for an executed action.
    fn record(&self, ctx: &mut RunContext, step: u32, action: Action, result: Value, planned: bool) {
        let ok = !is_failure(&result);
        match &action {
            Action::PerformSearch { query, engine } => {
                let key = SearchKey::new(*engine, query.as_str());
                ctx.memory.record_search(&key, ctx.plan_generation);
                if let Some(url) = result.get("url").and_then(Value::as_str) {
                    ctx.memory.visit(url);
                } else {
                    ctx.memory.visit(engine.search_url(query));
                }
            }
            Action::GoToPage { url } => ctx.memory.visit(url.trim()),
            Action::SaveFinding { finding } if ok => {
                let total = ctx.memory.findings().len();
                let saved = ctx
                    .memory
                    .findings()
                    .last()
                    .cloned()
                    .unwrap_or_else(|| finding.clone());
                self.emit(ResearchEvent::FindingSaved {
                    step,
                    finding: saved,
                    total,
                });
            }
            _ => {}
        }
        self.emit(ResearchEvent::ActionExecuted {
            step,
            action: action.clone(),
            ok,
            planned,
        });
        ctx.memory.push_history(step, action, result);
    }

    async fn replan(
        &self,
        ctx: &mut RunContext,
        settings: &RunSettings,
        planner: &dyn Planner,
        reason: String,
    ) {
        if ctx.replans_used >= self.config.max_replans {
            warn!(
                target: "orchestrator",
                replans_used = ctx.replans_used,
                max_replans = self.config.max_replans,
                "replan ceiling reached, continuing with current plan"
            );
            return;
        }
        let Some(previous_plan) = ctx.plan.clone() else {
            return;
        };
        ctx.phase = RunPhase::Replanning;
        let request = PlanRequest {
            task: settings.task.clone(),
            start_url: settings.start_url.clone(),
            max_findings: settings.max_findings,
            mode: settings.mode,
            default_engine: self.config.default_engine,
            prior: Some(PriorContext {
                previous_plan,
                reason: reason.clone(),
                findings: ctx.memory.findings().to_vec(),
                completed_searches: ctx.memory.completed_searches().iter().cloned().collect(),
                scratchpad_tail: ctx.memory.scratchpad_tail(REPLAN_SCRATCHPAD_CHARS),
            }),
        };
        let plan = planner.create_plan(&request).await;
        ctx.replans_used += 1;
        ctx.plan_generation += 1;
        ctx.current_search_index = 0;
        ctx.memory.note(format!(
            "--- Replanned (generation {}): {} --- {}",
            ctx.plan_generation,
            if reason.trim().is_empty() { "no reason given" } else { reason.trim() },
            plan.condensed()
        ));
        info!(
            target: "orchestrator",
            generation = ctx.plan_generation,
            replans_used = ctx.replans_used,
            "plan regenerated"
        );
        self.emit(ResearchEvent::Replanned {
            generation: ctx.plan_generation,
            reason,
        });
        self.emit(ResearchEvent::PlanReady {
            generation: ctx.plan_generation,
            plan: plan.clone(),
        });
        ctx.plan = Some(plan);
        ctx.phase = RunPhase::Stepping;
    }

    fn auto_finish(&self, ctx: &RunContext) -> Option<String> {
        if ctx.memory.is_full() && ctx.planned_searches_done() {
            Some(synthesize_summary(&ctx.memory))
        } else {
            None
        }
    }

    fn emit(&self, event: ResearchEvent) {
        if let Some(sender) = self.events.as_ref() {
            let _ = sender.send(event);
        }
    }
}

fn synthesize_summary(memory: &ResearchMemory) -> String {
    let findings = memory.findings();
    let mut summary = format!(
        "Collected {} finding(s) across {} search(es).",
        findings.len(),
        memory.completed_searches().len()
    );
    for finding in findings {
        summary.push_str(&format!("\n- {} ({})", finding.title, finding.url));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_findings() {
        let mut memory = ResearchMemory::new(2);
        memory.save_finding(Finding::validated("Axum", "https://docs.rs/axum", None, None).unwrap());
        let summary = synthesize_summary(&memory);
        assert!(summary.starts_with("Collected 1 finding(s)"));
        assert!(summary.contains("- Axum (https://docs.rs/axum)"));
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let outcome = ResearchOutcome {
            run_id: "run-1".into(),
            success: false,
            result: None,
            error: Some(MAX_STEPS_REACHED.into()),
            findings: vec![],
            history: vec![],
            plan: None,
            steps_taken: 3,
            replans_used: 0,
            elapsed_ms: 10,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["stepsTaken"], 3);
        assert_eq!(value["error"], "Max steps reached");
        assert!(value.get("result").is_none());
    }
}
