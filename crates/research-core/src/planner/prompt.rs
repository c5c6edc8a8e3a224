//! Prompt templates for research planning.

use super::PlanRequest;
use crate::utils::truncate_chars;

/// System prompt for the planning call.
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are a research planner for an autonomous web research agent. The agent drives a real browser through search engines and content pages and records structured findings.

## Your Job
Turn the research task into a concrete plan. Respond with a single JSON object that matches the provided schema.

## Guidelines
- **strategy**: one or two sentences describing how the research should proceed.
- **searchQueries**: 2-5 distinct queries, most important first. Each has an engine (google, bing or duckduckgo), a purpose and a priority (high, medium, low).
- **targetDomains**: optional list of domains that are likely to hold authoritative answers.
- **extraction**: the tools the agent should rely on (for example extractSearchResults, goToPage, getText, saveFinding) and how to read pages.
- **expectedFindings**: how many findings are realistic (1-20).
- **estimatedSteps**: how many browser steps the research should take (5-50).
- **depth**: broad for surveys, focused for a specific answer, deep for exhaustive coverage.

## When Replanning
You will be shown the previous plan, why it is being replaced, what has been found and which searches already ran. Do not repeat searches that were unproductive. Adjust queries, engines or target domains so the agent can make progress."#;

const MAX_PRIOR_FINDINGS: usize = 8;
const MAX_PRIOR_SEARCHES: usize = 10;

/// Build the user prompt for a planning call.
pub fn build_plan_prompt(request: &PlanRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str("## Task\n");
    prompt.push_str(request.task.trim());
    prompt.push_str("\n\n## Parameters\n");
    if let Some(url) = request.start_url.as_deref() {
        prompt.push_str(&format!("- Starting URL: {url}\n"));
    }
    prompt.push_str(&format!("- Target findings: {}\n", request.max_findings));
    prompt.push_str(&format!("- Performance mode: {}\n", request.mode));
    prompt.push_str(&format!("- Default search engine: {}\n", request.default_engine));

    if let Some(prior) = request.prior.as_ref() {
        prompt.push_str("\n## Previous Plan\n");
        prompt.push_str(&prior.previous_plan.condensed());
        prompt.push_str("\n\n## Replan Reason\n");
        if prior.reason.trim().is_empty() {
            prompt.push_str("(no reason given)");
        } else {
            prompt.push_str(prior.reason.trim());
        }

        prompt.push_str(&format!("\n\n## Findings So Far ({})\n", prior.findings.len()));
        if prior.findings.is_empty() {
            prompt.push_str("(none)\n");
        }
        for finding in prior.findings.iter().take(MAX_PRIOR_FINDINGS) {
            prompt.push_str(&format!("- {} ({})\n", finding.title, finding.url));
        }

        prompt.push_str("\n## Completed Searches\n");
        if prior.completed_searches.is_empty() {
            prompt.push_str("(none)\n");
        }
        let start = prior.completed_searches.len().saturating_sub(MAX_PRIOR_SEARCHES);
        for search in &prior.completed_searches[start..] {
            prompt.push_str(&format!("- \"{}\" on {}\n", search.query, search.engine));
        }

        if !prior.scratchpad_tail.trim().is_empty() {
            prompt.push_str("\n## Recent Notes\n");
            prompt.push_str(&truncate_chars(prior.scratchpad_tail.trim(), 600));
            prompt.push('\n');
        }
    }

    prompt.push_str("\nRespond with the plan JSON only.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SearchEngine;
    use crate::memory::{CompletedSearch, Finding};
    use crate::orchestrator::config::PerformanceMode;
    use crate::plan::ResearchPlan;
    use crate::planner::PriorContext;

    fn request() -> PlanRequest {
        PlanRequest {
            task: "best rust web frameworks".into(),
            start_url: Some("https://www.arewewebyet.org".into()),
            max_findings: 4,
            mode: PerformanceMode::Fast,
            default_engine: SearchEngine::Google,
            prior: None,
        }
    }

    #[test]
    fn initial_prompt_mentions_parameters() {
        let prompt = build_plan_prompt(&request());
        assert!(prompt.contains("best rust web frameworks"));
        assert!(prompt.contains("Starting URL: https://www.arewewebyet.org"));
        assert!(prompt.contains("Target findings: 4"));
        assert!(prompt.contains("Performance mode: fast"));
        assert!(!prompt.contains("Previous Plan"));
    }

    #[test]
    fn replan_prompt_carries_prior_context() {
        let mut req = request();
        req.prior = Some(PriorContext {
            previous_plan: ResearchPlan::fallback("rust web", SearchEngine::Google, 4),
            reason: "results were off-topic".into(),
            findings: vec![Finding::validated("Axum", "https://github.com/tokio-rs/axum", None, None).unwrap()],
            completed_searches: vec![CompletedSearch {
                engine: SearchEngine::Google,
                query: "rust web".into(),
                generation: 0,
            }],
            scratchpad_tail: "looked at blog posts".into(),
        });
        let prompt = build_plan_prompt(&req);
        assert!(prompt.contains("## Previous Plan"));
        assert!(prompt.contains("results were off-topic"));
        assert!(prompt.contains("Axum (https://github.com/tokio-rs/axum)"));
        assert!(prompt.contains("\"rust web\" on google"));
        assert!(prompt.contains("looked at blog posts"));
    }
}
