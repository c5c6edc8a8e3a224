//! Collaborator seams: browser driver, page analyzer and structured generator.
//!
//! Every method is async and fallible. Callers inside research-core treat any
//! error as "collaborator unavailable" and fall back rather than abort.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AgentError;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Wait for the load event.
    Load,
    #[default]
    DomContentLoaded,
    /// Return as soon as the navigation is committed.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

/// Options for multi-element reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementQuery {
    pub limit: usize,
    /// Attribute read alongside the text; `href` unless overridden.
    pub attribute: String,
}

impl ElementQuery {
    pub fn links(limit: usize) -> Self {
        Self {
            limit,
            attribute: "href".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageLink {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
    pub max_links: usize,
    pub timeout: Duration,
}

/// Structured page summary produced by a [`PageAnalyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    pub summary: String,
    pub title: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub content_type: String,
    #[serde(default)]
    pub links: Vec<PageLink>,
    #[serde(default)]
    pub data_points: Vec<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuickText {
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Request for one schema-constrained generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub schema_name: String,
    pub schema: Value,
    pub system: String,
    pub prompt: String,
    /// Machine-readable context. Real models ignore it; offline backends use it.
    #[serde(default)]
    pub hints: Map<String, Value>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitPolicy, timeout: Duration)
        -> Result<(), AgentError>;

    async fn click(&self, selector: &str) -> Result<(), AgentError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), AgentError>;

    async fn get_attribute(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, AgentError>;

    async fn get_text(&self, selector: &str) -> Result<String, AgentError>;

    async fn get_all_elements(
        &self,
        selector: &str,
        query: ElementQuery,
    ) -> Result<Vec<ElementSnapshot>, AgentError>;

    async fn scroll_into_view(&self, selector: &str) -> Result<(), AgentError>;

    async fn current_page_info(&self) -> Result<PageInfo, AgentError>;

    /// Release the browser session. Must be safe to call more than once.
    async fn close(&self) -> Result<(), AgentError>;
}

#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    async fn analyze(&self, url: &str, options: AnalyzeOptions)
        -> Result<PageAnalysis, AgentError>;

    async fn quick_extract_text(&self, url: &str, timeout: Duration)
        -> Result<QuickText, AgentError>;
}

/// Schema-constrained LLM backend.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, AgentError>;

    fn model_id(&self) -> &str;
}
