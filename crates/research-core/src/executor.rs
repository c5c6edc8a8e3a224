//! Dispatch from [`Action`] to collaborator calls.
//!
//! Failures never escape: every outcome is reported as a JSON result with an
//! `ok` flag so it can be recorded in history and shown to the model.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::action::{parse_web_url, Action};
use crate::errors::AgentError;
use crate::memory::{FindingOutcome, ResearchMemory};
use crate::ports::{BrowserDriver, ElementQuery, WaitPolicy};
use crate::utils::{bounded, squash_whitespace, truncate_chars};

pub const TEXT_RESULT_CHARS: usize = 2_000;
pub const DEFAULT_ELEMENT_LIMIT: usize = 25;
pub const MAX_ELEMENT_LIMIT: usize = 50;
pub const DEFAULT_RESULT_LIMIT: usize = 10;
pub const MAX_RESULT_LIMIT: usize = 25;
pub const MIN_SLEEP_MS: u64 = 50;
pub const MAX_SLEEP_MS: u64 = 5_000;
const ELEMENT_TEXT_CHARS: usize = 200;

/// Result-item selectors across supported engines, tried in order.
const SEARCH_RESULT_SELECTORS: &[&str] = &[
    "#search a:has(h3)",
    "#rso a:has(h3)",
    "#b_results li.b_algo h2 a",
    "a[data-testid='result-title-a']",
    "a.result__a",
];

/// Build the `{ok: false}` result for a failed action.
pub fn failure(err: &AgentError) -> Value {
    json!({ "ok": false, "error": err.to_string() })
}

pub fn is_failure(result: &Value) -> bool {
    result.get("ok").and_then(Value::as_bool) == Some(false)
}

pub struct ActionExecutor {
    navigation_timeout: Duration,
    browser_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(navigation_timeout: Duration, browser_timeout: Duration) -> Self {
        Self {
            navigation_timeout,
            browser_timeout,
        }
    }

    /// Execute one action. Memory-only actions mutate `memory`.
    pub async fn execute(
        &self,
        browser: &dyn BrowserDriver,
        memory: &mut ResearchMemory,
        action: &Action,
    ) -> Value {
        let outcome = self.dispatch(browser, memory, action).await;
        match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(target: "executor", tool = %action.tool_name(), error = %err, "action failed");
                failure(&err)
            }
        }
    }

    async fn dispatch(
        &self,
        browser: &dyn BrowserDriver,
        memory: &mut ResearchMemory,
        action: &Action,
    ) -> Result<Value, AgentError> {
        match action {
            Action::PerformSearch { query, engine } => {
                if query.trim().is_empty() {
                    return Err(AgentError::invalid_action("performSearch requires a query"));
                }
                let url = engine.search_url(query);
                self.navigate(browser, &url).await?;
                Ok(json!({ "ok": true, "url": url, "query": query.trim(), "engine": engine }))
            }
            Action::GoToPage { url } => {
                let parsed = parse_web_url(url)?;
                self.navigate(browser, parsed.as_str()).await?;
                Ok(json!({ "ok": true, "url": parsed.as_str() }))
            }
            Action::ClickElement { selector } => {
                self.bounded_call("click", browser.click(selector)).await?;
                Ok(json!({ "ok": true }))
            }
            Action::TypeText { selector, text } => {
                self.bounded_call("type text", browser.type_text(selector, text)).await?;
                Ok(json!({ "ok": true }))
            }
            Action::ScrollTo { selector } => {
                self.bounded_call("scroll", browser.scroll_into_view(selector)).await?;
                Ok(json!({ "ok": true }))
            }
            Action::GetText { selector } => {
                let text = self.bounded_call("get text", browser.get_text(selector)).await?;
                Ok(json!({ "ok": true, "text": truncate_chars(text.trim(), TEXT_RESULT_CHARS) }))
            }
            Action::GetAttribute {
                selector,
                attribute,
            } => {
                let value = self
                    .bounded_call("get attribute", browser.get_attribute(selector, attribute))
                    .await?;
                Ok(json!({ "ok": true, "value": value }))
            }
            Action::GetAllElements { selector, limit } => {
                let limit = limit
                    .unwrap_or(DEFAULT_ELEMENT_LIMIT)
                    .clamp(1, MAX_ELEMENT_LIMIT);
                let elements = self
                    .bounded_call(
                        "get all elements",
                        browser.get_all_elements(selector, ElementQuery::links(limit)),
                    )
                    .await?;
                let elements: Vec<Value> = elements
                    .into_iter()
                    .take(limit)
                    .map(|el| {
                        json!({
                            "text": truncate_chars(&squash_whitespace(&el.text), ELEMENT_TEXT_CHARS),
                            "href": el.attribute,
                        })
                    })
                    .collect();
                Ok(json!({ "ok": true, "count": elements.len(), "elements": elements }))
            }
            Action::ExtractSearchResults { limit } => {
                let limit = limit
                    .unwrap_or(DEFAULT_RESULT_LIMIT)
                    .clamp(1, MAX_RESULT_LIMIT);
                self.extract_search_results(browser, limit).await
            }
            Action::Sleep { ms } => {
                let ms = (*ms).clamp(MIN_SLEEP_MS, MAX_SLEEP_MS);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(json!({ "ok": true, "sleptMs": ms }))
            }
            Action::UpdateScratchpad { note } => {
                memory.note(note.as_str());
                Ok(json!({ "ok": true }))
            }
            Action::SaveFinding { finding } => match memory.save_finding(finding.clone()) {
                FindingOutcome::Saved { total } => Ok(json!({ "ok": true, "total": total })),
                FindingOutcome::AtCapacity { capacity } => Ok(json!({
                    "ok": false,
                    "error": format!("finding capacity ({capacity}) reached"),
                })),
                FindingOutcome::Invalid(reason) => Ok(json!({ "ok": false, "error": reason })),
            },
            Action::Replan { .. } | Action::FinishTask { .. } => {
                Ok(json!({ "ok": true, "control": true }))
            }
        }
    }

    async fn navigate(&self, browser: &dyn BrowserDriver, url: &str) -> Result<(), AgentError> {
        debug!(target: "executor", url, "navigating");
        bounded(
            "navigation",
            self.navigation_timeout,
            browser.navigate(url, WaitPolicy::DomContentLoaded, self.navigation_timeout),
        )
        .await
    }

    async fn bounded_call<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T, AgentError>>,
    ) -> Result<T, AgentError> {
        bounded(operation, self.browser_timeout, fut).await
    }

    async fn extract_search_results(
        &self,
        browser: &dyn BrowserDriver,
        limit: usize,
    ) -> Result<Value, AgentError> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut last_error = None;
        for selector in SEARCH_RESULT_SELECTORS {
            if results.len() >= limit {
                break;
            }
            let items = match self
                .bounded_call(
                    "extract search results",
                    browser.get_all_elements(selector, ElementQuery::links(limit)),
                )
                .await
            {
                Ok(items) => items,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };
            for item in items {
                let Some(href) = item.attribute.as_deref() else {
                    continue;
                };
                let Ok(url) = Url::parse(href.trim()) else {
                    continue;
                };
                if !matches!(url.scheme(), "http" | "https") {
                    continue;
                }
                let url = url.to_string();
                if !seen.insert(url.clone()) {
                    continue;
                }
                let title = squash_whitespace(&item.text);
                results.push(json!({
                    "title": if title.is_empty() { url.clone() } else { truncate_chars(&title, ELEMENT_TEXT_CHARS) },
                    "url": url,
                }));
                if results.len() >= limit {
                    break;
                }
            }
        }
        if results.is_empty() {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        Ok(json!({ "ok": true, "count": results.len(), "results": results }))
    }
}
