//! Deterministic offline backend.
//!
//! Reads the machine-readable `hints` of a [`GenerationRequest`] and answers
//! with a plausible plan or action, so the whole loop can run without a model.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::decision::ACTION_SCHEMA_NAME;
use crate::errors::AgentError;
use crate::observer::is_search_results_url;
use crate::planner::PLAN_SCHEMA_NAME;
use crate::ports::{GenerationRequest, StructuredGenerator};
use crate::utils::truncate_chars;

const FINDING_SUMMARY_CHARS: usize = 240;

#[derive(Debug, Clone)]
pub struct MockGenerator {
    model: String,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            model: "mock".to_string(),
        }
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StructuredGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, AgentError> {
        match request.schema_name.as_str() {
            PLAN_SCHEMA_NAME => Ok(mock_plan(&request.hints)),
            ACTION_SCHEMA_NAME => Ok(mock_action(&request.hints)),
            other => Err(AgentError::model(format!(
                "mock backend has no response for schema '{other}'"
            ))),
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn hint_str<'a>(hints: &'a Map<String, Value>, key: &str) -> &'a str {
    hints.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn hint_u64(hints: &Map<String, Value>, key: &str) -> u64 {
    hints.get(key).and_then(Value::as_u64).unwrap_or_default()
}

fn mock_plan(hints: &Map<String, Value>) -> Value {
    let task = hint_str(hints, "task").trim();
    let engine = hints
        .get("default_engine")
        .cloned()
        .unwrap_or_else(|| json!("google"));
    let expected = hint_u64(hints, "max_findings").max(1);
    let replan = hints.contains_key("replan_reason");
    let queries = if replan {
        vec![
            json!({"query": format!("{task} explained"), "engine": engine, "purpose": "Find explanatory material", "priority": "high"}),
            json!({"query": format!("{task} examples"), "engine": "bing", "purpose": "Try a different engine", "priority": "medium"}),
        ]
    } else {
        vec![
            json!({"query": task, "engine": engine, "purpose": "Direct search for the task", "priority": "high"}),
            json!({"query": format!("{task} overview"), "engine": engine, "purpose": "Find overview material", "priority": "medium"}),
        ]
    };
    json!({
        "strategy": if replan {
            format!("Rephrase the search for \"{task}\" and try another engine.")
        } else {
            format!("Search for \"{task}\", open the top results and save relevant pages.")
        },
        "searchQueries": queries,
        "extraction": {
            "tools": ["extractSearchResults", "goToPage", "saveFinding"],
            "strategy": "Read result pages and save those that match the task"
        },
        "expectedFindings": expected,
        "estimatedSteps": 15,
        "depth": "broad"
    })
}

fn mock_action(hints: &Map<String, Value>) -> Value {
    let findings = hint_u64(hints, "findings");
    let max_findings = hint_u64(hints, "max_findings").max(1);
    let task = hint_str(hints, "task");
    if findings >= max_findings {
        return json!({
            "tool": "finishTask",
            "summary": format!("Collected {findings} findings for \"{task}\".")
        });
    }

    let page_url = hint_str(hints, "page_url");
    let last_tool = hint_str(hints, "last_tool");
    let is_search = hints
        .get("is_search_results")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let visited: Vec<&str> = hints
        .get("visited_urls")
        .and_then(Value::as_array)
        .map(|urls| urls.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if is_search && last_tool != "extractSearchResults" {
        return json!({"tool": "extractSearchResults", "limit": 5});
    }

    let is_content = page_url.starts_with("http") && !is_search;
    if is_content && last_tool != "saveFinding" {
        let title = hint_str(hints, "page_title").trim();
        let summary = truncate_chars(hint_str(hints, "page_summary").trim(), FINDING_SUMMARY_CHARS);
        return json!({
            "tool": "saveFinding",
            "finding": {
                "title": if title.is_empty() { page_url } else { title },
                "url": page_url,
                "summary": summary,
                "source": "mock"
            }
        });
    }

    let next_link = hints
        .get("links")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|link| link.get("url").and_then(Value::as_str))
        .find(|url| !visited.contains(url) && !is_search_results_url(url));
    if let Some(url) = next_link {
        return json!({"tool": "goToPage", "url": url});
    }

    if hint_u64(hints, "pending_queries") > 0 || page_url.starts_with("about:") {
        return json!({"tool": "performSearch", "query": task, "engine": "google"});
    }

    json!({
        "tool": "finishTask",
        "summary": format!("No further leads. Collected {findings} findings for \"{task}\".")
    })
}
