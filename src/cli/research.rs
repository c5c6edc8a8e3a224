use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cdp_adapter::ChromiumBrowser;
use clap::Args;
use perceiver_semantic::SemanticPageAnalyzer;
use research_core::{
    PerformanceMode, ResearchAgent, ResearchEvent, ResearchOutcome, ResearchRequest,
    SearchEngine,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};
use crate::cli::plan::print_human_plan;
use crate::config::Provider;
use crate::llm::build_generator;

#[derive(Args, Clone, Debug)]
pub struct ResearchArgs {
    /// Research task in natural language
    pub task: String,

    /// Open this page before the first step
    #[arg(long, value_name = "URL")]
    pub start_url: Option<String>,

    /// Maximum loop iterations
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Finding capacity
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

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Skip deep page analysis and rely on quick text extraction
    #[arg(long)]
    pub no_analyzer: bool,

    /// Write the full outcome as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

pub async fn cmd_research(args: ResearchArgs, ctx: &CliContext) -> Result<()> {
    let task = args.task.trim().to_string();
    if task.is_empty() {
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

    let mut research = ctx.config().research.clone();
    if let Some(engine) = args.engine {
        research.default_engine = engine;
    }

    let mut request = ResearchRequest::new(task).with_model(generator);
    if let Some(url) = args.start_url.clone() {
        request = request.with_start_url(url);
    }
    if let Some(steps) = args.max_steps {
        request = request.with_max_steps(steps);
    }
    if let Some(findings) = args.max_findings {
        request = request.with_max_findings(findings);
    }
    if let Some(mode) = args.mode {
        request = request.with_mode(mode);
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut agent = ResearchAgent::new(research).with_events(events_tx);
    if !args.no_analyzer {
        let analyzer = SemanticPageAnalyzer::new(ctx.config().analyzer.clone())
            .context("failed to build page analyzer")?;
        agent = agent.with_analyzer(Arc::new(analyzer));
    }

    let mut browser_config = ctx.config().browser.clone();
    if args.headful {
        browser_config.headless = false;
    }
    info!(
        headless = browser_config.headless,
        provider = settings.provider.as_str(),
        model = %settings.model,
        "launching browser"
    );
    let browser = ChromiumBrowser::launch(browser_config)
        .await
        .context("failed to launch Chromium")?;

    let progress = tokio::spawn(report_progress(events_rx, ctx.output()));
    let outcome = agent.run(request, Box::new(browser)).await;
    // closes the event channel so the reporter drains and exits
    drop(agent);
    if let Err(err) = progress.await {
        warn!(?err, "progress reporter stopped unexpectedly");
    }
    let outcome = outcome?;

    if let Some(path) = &args.save {
        save_outcome(path, &outcome).await?;
    }

    emit(&outcome, ctx.output(), || print_human_outcome(&outcome))?;

    if !outcome.success {
        bail!(
            "research did not complete: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn report_progress(mut events: mpsc::UnboundedReceiver<ResearchEvent>, output: OutputFormat) {
    while let Some(event) = events.recv().await {
        if !output.is_human() {
            continue;
        }
        match event {
            ResearchEvent::PlanReady { generation, plan } => {
                if generation == 0 {
                    println!("Plan");
                } else {
                    println!("Revised plan (#{generation})");
                }
                print_human_plan(&plan);
                println!();
            }
            ResearchEvent::StepStarted { .. } => {}
            ResearchEvent::ActionExecuted {
                step,
                action,
                ok,
                planned,
            } => {
                let marker = if ok { "ok" } else { "failed" };
                let origin = if planned { " (planned)" } else { "" };
                println!("[step {step:>2}] {}{origin}: {marker}", action.describe());
            }
            ResearchEvent::FindingSaved {
                finding, total, ..
            } => {
                println!("          + finding {total}: {} <{}>", finding.title, finding.url);
            }
            ResearchEvent::Replanned { generation, reason } => {
                println!("          replanning (#{generation}): {reason}");
            }
            ResearchEvent::Finished { .. } => {}
        }
    }
}

fn print_human_outcome(outcome: &ResearchOutcome) {
    println!();
    if outcome.success {
        println!("Research complete in {} step(s)", outcome.steps_taken);
    } else {
        println!(
            "Research stopped after {} step(s): {}",
            outcome.steps_taken,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    if let Some(result) = &outcome.result {
        println!("{result}");
    }
    if outcome.findings.is_empty() {
        println!("No findings.");
    } else {
        println!("Findings:");
        for (idx, finding) in outcome.findings.iter().enumerate() {
            println!("  {}. {}", idx + 1, finding.title);
            println!("     {}", finding.url);
            if let Some(summary) = finding.summary.as_deref().filter(|s| !s.is_empty()) {
                println!("     {summary}");
            }
        }
    }
    println!(
        "run {}  replans {}  elapsed {:.1}s",
        outcome.run_id,
        outcome.replans_used,
        outcome.elapsed_ms as f64 / 1000.0
    );
}

async fn save_outcome(path: &Path, outcome: &ResearchOutcome) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(outcome)?;
    tokio::fs::write(path, payload)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "saved research outcome");
    Ok(())
}
