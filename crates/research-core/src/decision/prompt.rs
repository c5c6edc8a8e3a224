//! Prompt templates for per-step decisions.

use super::DecisionContext;
use crate::action::Action;
use crate::utils::truncate_chars;

/// System prompt for the decision call.
pub const DECISION_SYSTEM_PROMPT: &str = r#"You are the decision engine of an autonomous web research agent. At every step you see the research plan, the agent's memory and the current page, and you choose exactly ONE next action.

## Available Tools
- **performSearch** `{query, engine}`: open a search engine results page.
- **goToPage** `{url}`: navigate to an absolute URL.
- **clickElement** `{selector}`, **typeText** `{selector, text}`, **scrollTo** `{selector}`: interact with the page using CSS selectors.
- **getText** `{selector}`, **getAttribute** `{selector, attribute}`, **getAllElements** `{selector, limit}`: read from the page.
- **extractSearchResults** `{limit}`: collect titles and URLs from the current results page.
- **sleep** `{ms}`: wait for the page (50-5000 ms).
- **updateScratchpad** `{note}`: write down something to remember.
- **saveFinding** `{finding: {title, url, summary, source}}`: record a finding that answers the task.
- **replan** `{reason}`: ask for a new plan when the current one is not working.
- **finishTask** `{summary}`: end the research with a summary of what was found.

## Policy
- On a search results page, prefer **extractSearchResults** before leaving it.
- Do not revisit any of the recently visited URLs.
- Prefer links on the plan's target domains.
- Save a finding only for information that directly helps answer the task, with the URL it came from.
- If searches keep returning irrelevant results, issue **replan** with a short reason.
- Call **finishTask** once enough good findings exist.

Respond with a single JSON object whose `tool` field names the action."#;

const MAX_COMPLETED_SEARCHES: usize = 5;
const MAX_PAGE_LINKS: usize = 10;
const MAX_RECENT_FINDINGS: usize = 4;
const SCRATCHPAD_CHARS: usize = 1_000;
const MAX_RECENT_URLS: usize = 10;
const PAGE_SUMMARY_CHARS: usize = 2_000;

/// Build the user prompt for one decision.
pub fn build_decision_prompt(ctx: &DecisionContext<'_>) -> String {
    let plan = ctx.plan;
    let memory = ctx.memory;
    let page = ctx.page;
    let mut prompt = format!("## Task\n{}\n\n## Plan\n", ctx.task.trim());
    prompt.push_str(&format!("- Strategy: {}\n", plan.strategy));
    prompt.push_str(&format!("- Depth: {}\n", plan.depth.as_str()));
    if !plan.extraction.strategy.is_empty() {
        prompt.push_str(&format!("- Extraction: {}\n", plan.extraction.strategy));
    }
    if !plan.extraction.tools.is_empty() {
        let tools = plan
            .extraction
            .tools
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!("- Preferred tools: {tools}\n"));
    }
    if let Some(domains) = plan.target_domains.as_ref().filter(|d| !d.is_empty()) {
        prompt.push_str(&format!("- Target domains: {}\n", domains.join(", ")));
    }

    prompt.push_str("\n## Pending Planned Searches\n");
    let pending = ctx.pending_queries();
    if pending.is_empty() {
        prompt.push_str("(all planned searches done)\n");
    }
    for query in pending {
        prompt.push_str(&format!(
            "- \"{}\" on {} [{:?}]: {}\n",
            query.query, query.engine, query.priority, query.purpose
        ));
    }

    prompt.push_str("\n## Completed Searches\n");
    let completed = memory.completed_searches().recent(MAX_COMPLETED_SEARCHES);
    if completed.is_empty() {
        prompt.push_str("(none)\n");
    }
    for search in completed {
        prompt.push_str(&format!("- \"{}\" on {}\n", search.query, search.engine));
    }

    prompt.push_str("\n## Current Page\n");
    prompt.push_str(&format!("- URL: {}\n", page.url));
    prompt.push_str(&format!("- Title: {}\n", page.title));
    prompt.push_str(&format!(
        "- Type: {}\n",
        if page.is_search_results_page {
            "search results"
        } else {
            "content"
        }
    ));
    prompt.push_str("- Summary:\n");
    prompt.push_str(&truncate_chars(&page.content_summary, PAGE_SUMMARY_CHARS));
    prompt.push('\n');
    if !page.links.is_empty() {
        prompt.push_str("- Links:\n");
        for (idx, link) in page.links.iter().take(MAX_PAGE_LINKS).enumerate() {
            prompt.push_str(&format!("  {}. {} ({})\n", idx + 1, link.text, link.url));
        }
    }

    let saved = memory.findings().len();
    let capacity = memory.max_findings().max(1);
    prompt.push_str(&format!(
        "\n## Progress\nStep {} of {}. Findings: {saved}/{} ({}%)\n",
        ctx.step,
        ctx.max_steps,
        memory.max_findings(),
        saved * 100 / capacity
    ));
    let start = saved.saturating_sub(MAX_RECENT_FINDINGS);
    for finding in &memory.findings()[start..] {
        prompt.push_str(&format!("- {} ({})\n", finding.title, finding.url));
    }

    let scratchpad = memory.scratchpad_tail(SCRATCHPAD_CHARS);
    if !scratchpad.is_empty() {
        prompt.push_str("\n## Scratchpad\n");
        prompt.push_str(&scratchpad);
        prompt.push('\n');
    }

    let recent_urls = memory.recent_urls(MAX_RECENT_URLS);
    if !recent_urls.is_empty() {
        prompt.push_str("\n## Recently Visited (do not revisit)\n");
        for url in recent_urls {
            prompt.push_str(&format!("- {url}\n"));
        }
    }

    let history = memory.recent_history(ctx.history_window);
    if !history.is_empty() {
        prompt.push_str("\n## Recent Actions\n");
        for entry in history {
            match &entry.action {
                Action::PerformSearch { query, .. } => {
                    prompt.push_str(&format!("- step {}: performSearch \"{query}\"\n", entry.step))
                }
                action => prompt.push_str(&format!("- step {}: {}\n", entry.step, action.tool_name())),
            }
        }
    }

    prompt.push_str("\nChoose the single next action.");
    prompt
}
