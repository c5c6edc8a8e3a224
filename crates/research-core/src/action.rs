//! Action protocol shared by the decision backend and the executor.
//!
//! Every step of a research run produces exactly one [`Action`]. The enum is
//! closed: a model response either deserializes into one variant or it is
//! rejected, there is no "multiple actions" or free-form tool call.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::errors::AgentError;
use crate::memory::Finding;

/// Search engines the agent knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Google,
    Bing,
    Duckduckgo,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Bing => "bing",
            SearchEngine::Duckduckgo => "duckduckgo",
        }
    }

    /// Results page URL for `query` on this engine.
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        match self {
            SearchEngine::Google => format!("https://www.google.com/search?q={encoded}"),
            SearchEngine::Bing => format!("https://www.bing.com/search?q={encoded}"),
            SearchEngine::Duckduckgo => format!("https://duckduckgo.com/?q={encoded}"),
        }
    }
}

impl std::fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchEngine {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(SearchEngine::Google),
            "bing" => Ok(SearchEngine::Bing),
            "duckduckgo" | "ddg" => Ok(SearchEngine::Duckduckgo),
            other => Err(AgentError::invalid_request(format!(
                "unknown search engine '{other}'"
            ))),
        }
    }
}

/// Tool names, used by plans to declare their extraction toolset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    PerformSearch,
    GoToPage,
    ClickElement,
    TypeText,
    GetText,
    GetAttribute,
    GetAllElements,
    ExtractSearchResults,
    ScrollTo,
    Sleep,
    UpdateScratchpad,
    SaveFinding,
    Replan,
    FinishTask,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::PerformSearch => "performSearch",
            ToolName::GoToPage => "goToPage",
            ToolName::ClickElement => "clickElement",
            ToolName::TypeText => "typeText",
            ToolName::GetText => "getText",
            ToolName::GetAttribute => "getAttribute",
            ToolName::GetAllElements => "getAllElements",
            ToolName::ExtractSearchResults => "extractSearchResults",
            ToolName::ScrollTo => "scrollTo",
            ToolName::Sleep => "sleep",
            ToolName::UpdateScratchpad => "updateScratchpad",
            ToolName::SaveFinding => "saveFinding",
            ToolName::Replan => "replan",
            ToolName::FinishTask => "finishTask",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step's worth of work, chosen by the decision engine or the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum Action {
    /// Open the results page for `query` on `engine`.
    PerformSearch {
        query: String,
        #[serde(default)]
        engine: SearchEngine,
    },
    /// Navigate to an absolute URL.
    GoToPage { url: String },
    ClickElement { selector: String },
    TypeText { selector: String, text: String },
    /// Read the text of the first element matching `selector`.
    GetText { selector: String },
    GetAttribute { selector: String, attribute: String },
    /// Read text and href of every element matching `selector`.
    GetAllElements {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    /// Collect result titles and URLs from the current search results page.
    ExtractSearchResults {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    ScrollTo { selector: String },
    /// Pause for `ms` milliseconds (clamped to 50..=5000).
    Sleep { ms: u64 },
    /// Append a note to the scratchpad.
    UpdateScratchpad { note: String },
    /// Record a finding.
    SaveFinding { finding: Finding },
    /// Ask for a new plan.
    Replan {
        #[serde(default)]
        reason: String,
    },
    /// End the run with a summary of the results.
    FinishTask { summary: String },
}

/// Parse an absolute HTTP(S) URL for navigation; every other scheme is refused.
pub fn parse_web_url(raw: &str) -> Result<Url, AgentError> {
    let parsed = Url::parse(raw.trim()).map_err(|err| {
        AgentError::invalid_action(format!("goToPage url '{raw}' is not absolute: {err}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(AgentError::invalid_action(format!(
            "goToPage url '{raw}' uses unsupported scheme '{other}'"
        ))),
    }
}

impl Action {
    /// Parse a backend response into an action and check its required fields.
    pub fn from_value(value: Value) -> Result<Self, AgentError> {
        let action: Action = serde_json::from_value(value)
            .map_err(|err| AgentError::invalid_action(format!("unrecognised action: {err}")))?;
        action.validate()
    }

    /// Reject payloads whose required text fields are blank.
    pub fn validate(self) -> Result<Self, AgentError> {
        let blank = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(AgentError::invalid_action(format!(
                    "{} requires a non-empty {field}",
                    self.tool_name()
                )))
            } else {
                Ok(())
            }
        };
        match &self {
            Action::PerformSearch { query, .. } => blank("query", query)?,
            Action::GoToPage { url } => {
                blank("url", url)?;
                parse_web_url(url)?;
            }
            Action::ClickElement { selector }
            | Action::GetText { selector }
            | Action::ScrollTo { selector }
            | Action::GetAllElements { selector, .. } => blank("selector", selector)?,
            Action::TypeText { selector, .. } => blank("selector", selector)?,
            Action::GetAttribute {
                selector,
                attribute,
            } => {
                blank("selector", selector)?;
                blank("attribute", attribute)?;
            }
            Action::UpdateScratchpad { note } => blank("note", note)?,
            Action::ExtractSearchResults { .. }
            | Action::Sleep { .. }
            | Action::SaveFinding { .. }
            | Action::Replan { .. }
            | Action::FinishTask { .. } => {}
        }
        Ok(self)
    }

    pub fn tool_name(&self) -> ToolName {
        match self {
            Action::PerformSearch { .. } => ToolName::PerformSearch,
            Action::GoToPage { .. } => ToolName::GoToPage,
            Action::ClickElement { .. } => ToolName::ClickElement,
            Action::TypeText { .. } => ToolName::TypeText,
            Action::GetText { .. } => ToolName::GetText,
            Action::GetAttribute { .. } => ToolName::GetAttribute,
            Action::GetAllElements { .. } => ToolName::GetAllElements,
            Action::ExtractSearchResults { .. } => ToolName::ExtractSearchResults,
            Action::ScrollTo { .. } => ToolName::ScrollTo,
            Action::Sleep { .. } => ToolName::Sleep,
            Action::UpdateScratchpad { .. } => ToolName::UpdateScratchpad,
            Action::SaveFinding { .. } => ToolName::SaveFinding,
            Action::Replan { .. } => ToolName::Replan,
            Action::FinishTask { .. } => ToolName::FinishTask,
        }
    }

    /// Control actions are handled by the orchestrator, not the browser.
    pub fn is_control(&self) -> bool {
        matches!(self, Action::Replan { .. } | Action::FinishTask { .. })
    }

    /// Short human readable description for logs and progress output.
    pub fn describe(&self) -> String {
        match self {
            Action::PerformSearch { query, engine } => format!("search {engine} for \"{query}\""),
            Action::GoToPage { url } => format!("open {url}"),
            Action::ClickElement { selector } => format!("click {selector}"),
            Action::TypeText { selector, text } => {
                format!("type into {selector} ({} chars)", text.chars().count())
            }
            Action::GetText { selector } => format!("read text of {selector}"),
            Action::GetAttribute {
                selector,
                attribute,
            } => format!("read {attribute} of {selector}"),
            Action::GetAllElements { selector, .. } => format!("list elements {selector}"),
            Action::ExtractSearchResults { .. } => "extract search results".to_string(),
            Action::ScrollTo { selector } => format!("scroll to {selector}"),
            Action::Sleep { ms } => format!("sleep {ms}ms"),
            Action::UpdateScratchpad { .. } => "update scratchpad".to_string(),
            Action::SaveFinding { finding } => format!("save finding \"{}\"", finding.title),
            Action::Replan { reason } if reason.is_empty() => "replan".to_string(),
            Action::Replan { reason } => format!("replan: {reason}"),
            Action::FinishTask { .. } => "finish task".to_string(),
        }
    }
}
