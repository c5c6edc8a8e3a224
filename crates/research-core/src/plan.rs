use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::action::{SearchEngine, ToolName};
use crate::errors::AgentError;

pub const MIN_EXPECTED_FINDINGS: u32 = 1;
pub const MAX_EXPECTED_FINDINGS: u32 = 20;
pub const MIN_ESTIMATED_STEPS: u32 = 5;
pub const MAX_ESTIMATED_STEPS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    #[default]
    Broad,
    Focused,
    Deep,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Broad => "broad",
            Depth::Focused => "focused",
            Depth::Deep => "deep",
        }
    }
}

/// Identity of a search for dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchKey {
    pub engine: SearchEngine,
    pub query: String,
}

impl SearchKey {
    pub fn new(engine: SearchEngine, query: impl Into<String>) -> Self {
        Self {
            engine,
            query: query.into().trim().to_string(),
        }
    }
}

/// One search the plan wants executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub engine: SearchEngine,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub priority: Priority,
}

impl SearchQuery {
    pub fn key(&self) -> SearchKey {
        SearchKey::new(self.engine, &self.query)
    }
}

/// How the agent intends to pull information out of pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    #[serde(default)]
    pub tools: Vec<ToolName>,
    #[serde(default)]
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<String>>,
}

/// Declarative plan for one research run. Replaced wholesale on replan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPlan {
    pub strategy: String,
    pub search_queries: Vec<SearchQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_domains: Option<Vec<String>>,
    #[serde(default)]
    pub extraction: Extraction,
    pub expected_findings: u32,
    pub estimated_steps: u32,
    #[serde(default)]
    pub depth: Depth,
}

impl ResearchPlan {
    /// Check required fields and clamp the numeric estimates into range.
    pub fn validated(mut self) -> Result<Self, AgentError> {
        self.strategy = self.strategy.trim().to_string();
        if self.strategy.is_empty() {
            return Err(AgentError::invalid_plan("strategy is empty"));
        }
        self.search_queries.retain(|q| !q.query.trim().is_empty());
        for query in &mut self.search_queries {
            query.query = query.query.trim().to_string();
        }
        if self.search_queries.is_empty() {
            return Err(AgentError::invalid_plan(
                "plan contains no usable search queries",
            ));
        }
        if let Some(domains) = self.target_domains.as_mut() {
            domains.retain(|d| !d.trim().is_empty());
        }
        self.expected_findings = self
            .expected_findings
            .clamp(MIN_EXPECTED_FINDINGS, MAX_EXPECTED_FINDINGS);
        self.estimated_steps = self
            .estimated_steps
            .clamp(MIN_ESTIMATED_STEPS, MAX_ESTIMATED_STEPS);
        Ok(self)
    }

    /// Deterministic plan used when the model cannot produce one.
    pub fn fallback(task: &str, engine: SearchEngine, max_findings: usize) -> Self {
        let task = task.trim();
        let expected = u32::try_from(max_findings)
            .unwrap_or(MAX_EXPECTED_FINDINGS)
            .clamp(MIN_EXPECTED_FINDINGS, MAX_EXPECTED_FINDINGS);
        Self {
            strategy: format!("Search broadly for \"{task}\" and collect the most relevant sources."),
            search_queries: vec![
                SearchQuery {
                    query: task.to_string(),
                    engine,
                    purpose: "Direct search for the task".to_string(),
                    priority: Priority::High,
                },
                SearchQuery {
                    query: format!("{task} guide"),
                    engine,
                    purpose: "Find overview and guide material".to_string(),
                    priority: Priority::Medium,
                },
            ],
            target_domains: None,
            extraction: Extraction {
                tools: vec![
                    ToolName::ExtractSearchResults,
                    ToolName::GoToPage,
                    ToolName::GetText,
                    ToolName::SaveFinding,
                ],
                strategy: "Open promising results and save what answers the task".to_string(),
                selectors: None,
            },
            expected_findings: expected,
            estimated_steps: 20,
            depth: Depth::Broad,
        }
    }

    /// One-paragraph summary used in replan prompts and the scratchpad.
    pub fn condensed(&self) -> String {
        let queries = self
            .search_queries
            .iter()
            .map(|q| format!("\"{}\" ({})", q.query, q.engine))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "strategy: {}; depth: {}; queries: {}",
            self.strategy,
            self.depth.as_str(),
            queries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_camel_case_plan_and_clamps() {
        let plan: ResearchPlan = serde_json::from_value(json!({
            "strategy": "compare frameworks",
            "searchQueries": [
                {"query": "axum vs actix", "engine": "bing", "purpose": "compare", "priority": "high"},
                {"query": "   "}
            ],
            "extraction": {"tools": ["getText", "saveFinding"], "strategy": "read"},
            "expectedFindings": 99,
            "estimatedSteps": 1,
            "depth": "focused"
        }))
        .unwrap();
        let plan = plan.validated().unwrap();
        assert_eq!(plan.search_queries.len(), 1);
        assert_eq!(plan.search_queries[0].engine, SearchEngine::Bing);
        assert_eq!(plan.expected_findings, MAX_EXPECTED_FINDINGS);
        assert_eq!(plan.estimated_steps, MIN_ESTIMATED_STEPS);
        assert_eq!(plan.depth, Depth::Focused);
    }

    #[test]
    fn empty_strategy_is_invalid() {
        let mut plan = ResearchPlan::fallback("x", SearchEngine::Google, 3);
        plan.strategy = " ".into();
        assert!(matches!(plan.validated(), Err(AgentError::InvalidPlan(_))));
    }

    #[test]
    fn fallback_plan_is_broad_with_two_queries() {
        let plan = ResearchPlan::fallback("  tokio tutorials ", SearchEngine::Bing, 50)
            .validated()
            .unwrap();
        assert_eq!(plan.depth, Depth::Broad);
        assert_eq!(plan.search_queries[0].query, "tokio tutorials");
        assert_eq!(plan.search_queries[1].query, "tokio tutorials guide");
        assert!(plan
            .search_queries
            .iter()
            .all(|q| q.engine == SearchEngine::Bing));
        assert_eq!(plan.expected_findings, MAX_EXPECTED_FINDINGS);
    }

    #[test]
    fn search_key_trims_query() {
        assert_eq!(
            SearchKey::new(SearchEngine::Google, " rust "),
            SearchKey::new(SearchEngine::Google, "rust")
        );
    }
}
