//! Research agent core.
//!
//! Plans a research task with a structured-generation model, then drives a
//! browser step by step through plan-driven searches and model decisions,
//! collecting a bounded set of findings.

pub mod action;
pub mod decision;
pub mod errors;
pub mod executor;
pub mod memory;
pub mod mock;
pub mod observer;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod ports;
pub mod utils;

pub use action::{parse_web_url, Action, SearchEngine, ToolName};
pub use decision::{action_schema, DecisionContext, DecisionEngine, LlmDecisionEngine};
pub use errors::AgentError;
pub use executor::ActionExecutor;
pub use memory::{ActionHistoryEntry, CompletedSearch, Finding, ResearchMemory};
pub use mock::MockGenerator;
pub use observer::{ObserveOptions, PageObserver, PageState};
pub use orchestrator::{
    ModeProfile, PerformanceMode, ResearchAgent, ResearchConfig, ResearchEvent, ResearchOutcome,
    ResearchRequest, RunPhase,
};
pub use plan::{Depth, Extraction, Priority, ResearchPlan, SearchKey, SearchQuery};
pub use planner::{plan_schema, LlmPlanner, PlanRequest, Planner, PriorContext};
pub use utils::duration_ms;
pub use ports::{
    AnalyzeOptions, BrowserDriver, ElementQuery, ElementSnapshot, GenerationRequest, PageAnalysis,
    PageAnalyzer, PageInfo, PageLink, QuickText, StructuredGenerator, WaitPolicy,
};
