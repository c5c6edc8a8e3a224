use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use research_core::{
    LlmPlanner, PerformanceMode, PlanRequest, Planner, ResearchPlan, SearchEngine,
};
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::emit;
use crate::config::Provider;
use crate::llm::build_generator;

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Research task in natural language
    pub task: String,

    /// Page the run would start from
    #[arg(long, value_name = "URL")]
    pub start_url: Option<String>,

    /// Finding capacity the plan should aim for
    #[arg(long)]
    pub max_findings: Option<usize>,

    /// Performance mode (fast, balanced, thorough)
    #[arg(long)]
    pub mode: Option<PerformanceMode>,

    /// Default search engine (google, bing, duckduckgo)
    #[arg(long)]
    pub engine: Option<SearchEngine>,

    /// Generation backend (openai, mock)
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Model name passed to the backend
    #[arg(long)]
    pub model: Option<String>,

    /// Fail instead of printing the fallback plan when generation fails
    #[arg(long)]
    pub strict: bool,
}

pub async fn cmd_plan(args: PlanArgs, ctx: &CliContext) -> Result<()> {
    if args.task.trim().is_empty() {
        bail!("task must not be empty");
    }
    let mut settings = ctx.config().llm.clone();
    if let Some(provider) = args.provider {
        settings.provider = provider;
    }
    if let Some(model) = args.model.clone() {
        settings.model = model;
    }
    let generator = build_generator(&settings).context("failed to build model backend")?;

    let research = &ctx.config().research;
    let request = PlanRequest {
        task: args.task.trim().to_string(),
        start_url: args.start_url.clone(),
        max_findings: args.max_findings.unwrap_or(research.max_findings).max(1),
        mode: args.mode.unwrap_or(research.performance_mode),
        default_engine: args.engine.unwrap_or(research.default_engine),
        prior: None,
    };

    let planner =
        LlmPlanner::new(generator).with_timeout(Duration::from_millis(research.model_timeout_ms));
    let plan = if args.strict {
        planner.try_create_plan(&request).await?
    } else {
        planner.create_plan(&request).await
    };
    info!(queries = plan.search_queries.len(), "plan ready");

    emit(&plan, ctx.output(), || print_human_plan(&plan))
}

pub(crate) fn print_human_plan(plan: &ResearchPlan) {
    println!("Strategy: {}", plan.strategy);
    println!(
        "Depth: {}  expected findings: {}  estimated steps: {}",
        plan.depth.as_str(),
        plan.expected_findings,
        plan.estimated_steps
    );
    println!("Search queries:");
    for (idx, query) in plan.search_queries.iter().enumerate() {
        if query.purpose.is_empty() {
            println!("  {}. [{}] {}", idx + 1, query.engine, query.query);
        } else {
            println!(
                "  {}. [{}] {}  ({})",
                idx + 1,
                query.engine,
                query.query,
                query.purpose
            );
        }
    }
    if let Some(domains) = plan.target_domains.as_ref().filter(|d| !d.is_empty()) {
        println!("Target domains: {}", domains.join(", "));
    }
}
