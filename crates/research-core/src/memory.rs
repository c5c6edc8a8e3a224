//! Per-run research memory: findings, scratchpad, visited URLs, completed
//! searches and the action history.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::action::{Action, SearchEngine};
use crate::errors::AgentError;
use crate::plan::SearchKey;

/// A recorded fact with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Finding {
    /// Build a finding, rejecting empty titles and non-HTTP(S) URLs.
    pub fn validated(
        title: impl Into<String>,
        url: impl Into<String>,
        summary: Option<String>,
        source: Option<String>,
    ) -> Result<Self, AgentError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(AgentError::invalid_action("finding title is empty"));
        }
        let url = url.into().trim().to_string();
        let parsed = Url::parse(&url)
            .map_err(|err| AgentError::invalid_action(format!("finding url '{url}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AgentError::invalid_action(format!(
                "finding url '{url}' must be http(s)"
            )));
        }
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok(Self {
            title,
            url,
            summary: clean(summary),
            source: clean(source),
        })
    }

    /// Re-run validation on a finding that arrived through deserialization.
    pub fn revalidate(self) -> Result<Self, AgentError> {
        Self::validated(self.title, self.url, self.summary, self.source)
    }
}

/// A search that was executed, tagged with the plan generation it ran under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSearch {
    pub engine: SearchEngine,
    pub query: String,
    pub generation: u32,
}

/// Append-only record of executed searches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletedSearches {
    entries: Vec<CompletedSearch>,
}

impl CompletedSearches {
    /// Record `key` for `generation`. Returns false when it was already present.
    pub fn record(&mut self, key: &SearchKey, generation: u32) -> bool {
        if self.contains_in(key, generation) {
            return false;
        }
        self.entries.push(CompletedSearch {
            engine: key.engine,
            query: key.query.clone(),
            generation,
        });
        true
    }

    pub fn contains_in(&self, key: &SearchKey, generation: u32) -> bool {
        self.entries.iter().any(|entry| {
            entry.generation == generation && entry.engine == key.engine && entry.query == key.query
        })
    }

    pub fn count_in(&self, generation: u32) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.generation == generation)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent `n` searches, oldest first.
    pub fn recent(&self, n: usize) -> &[CompletedSearch] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletedSearch> {
        self.entries.iter()
    }
}

/// One executed action and its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHistoryEntry {
    pub step: u32,
    pub action: Action,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of trying to store a finding.
#[derive(Debug, Clone, PartialEq)]
pub enum FindingOutcome {
    Saved { total: usize },
    AtCapacity { capacity: usize },
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ResearchMemory {
    findings: Vec<Finding>,
    scratchpad: Vec<String>,
    visited_urls: Vec<String>,
    visited_index: HashSet<String>,
    completed_searches: CompletedSearches,
    history: Vec<ActionHistoryEntry>,
    max_findings: usize,
}

impl ResearchMemory {
    pub fn new(max_findings: usize) -> Self {
        Self {
            findings: Vec::new(),
            scratchpad: Vec::new(),
            visited_urls: Vec::new(),
            visited_index: HashSet::new(),
            completed_searches: CompletedSearches::default(),
            history: Vec::new(),
            max_findings,
        }
    }

    pub fn max_findings(&self) -> usize {
        self.max_findings
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn is_full(&self) -> bool {
        self.findings.len() >= self.max_findings
    }

    /// Validate and append a finding unless memory is at capacity.
    pub fn save_finding(&mut self, finding: Finding) -> FindingOutcome {
        if self.is_full() {
            return FindingOutcome::AtCapacity {
                capacity: self.max_findings,
            };
        }
        match finding.revalidate() {
            Ok(finding) => {
                self.findings.push(finding);
                FindingOutcome::Saved {
                    total: self.findings.len(),
                }
            }
            Err(err) => FindingOutcome::Invalid(err.to_string()),
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        let note = note.trim();
        if !note.is_empty() {
            self.scratchpad.push(note.to_string());
        }
    }

    pub fn scratchpad_text(&self) -> String {
        self.scratchpad.join("\n")
    }

    /// The last `max_chars` characters of the scratchpad.
    pub fn scratchpad_tail(&self, max_chars: usize) -> String {
        crate::utils::tail_chars(&self.scratchpad_text(), max_chars)
    }

    pub fn visit(&mut self, url: impl Into<String>) {
        let url = url.into();
        if self.visited_index.insert(url.clone()) {
            self.visited_urls.push(url);
        }
    }

    pub fn has_visited(&self, url: &str) -> bool {
        self.visited_index.contains(url)
    }

    pub fn visited_urls(&self) -> &[String] {
        &self.visited_urls
    }

    /// Most recently first-visited URLs, oldest first.
    pub fn recent_urls(&self, n: usize) -> &[String] {
        let start = self.visited_urls.len().saturating_sub(n);
        &self.visited_urls[start..]
    }

    pub fn completed_searches(&self) -> &CompletedSearches {
        &self.completed_searches
    }

    pub fn record_search(&mut self, key: &SearchKey, generation: u32) -> bool {
        self.completed_searches.record(key, generation)
    }

    pub fn push_history(&mut self, step: u32, action: Action, result: Value) {
        self.history.push(ActionHistoryEntry {
            step,
            action,
            result,
            timestamp: Utc::now(),
        });
    }

    pub fn history(&self) -> &[ActionHistoryEntry] {
        &self.history
    }

    /// The prompt-visible window of history.
    pub fn recent_history(&self, window: usize) -> &[ActionHistoryEntry] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }

    pub fn into_parts(self) -> (Vec<Finding>, Vec<ActionHistoryEntry>) {
        (self.findings, self.history)
    }
}
