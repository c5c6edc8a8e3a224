use thiserror::Error;

/// Errors emitted by the research-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raised when a research request is malformed or missing required fields.
    #[error("invalid research request: {0}")]
    InvalidRequest(String),

    /// Raised when a generated plan fails validation.
    #[error("invalid research plan: {0}")]
    InvalidPlan(String),

    /// Raised when an action payload cannot be executed as given.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Browser driver failure (navigation, DOM query, session).
    #[error("browser unavailable: {0}")]
    Browser(String),

    /// Page analyzer failure.
    #[error("page analyzer failed: {0}")]
    Analyzer(String),

    /// Structured-generation backend failure.
    #[error("model backend failed: {0}")]
    Model(String),

    /// A collaborator call exceeded its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan(message.into())
    }

    pub fn invalid_action(message: impl Into<String>) -> Self {
        Self::InvalidAction(message.into())
    }

    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser(message.into())
    }

    pub fn analyzer(message: impl Into<String>) -> Self {
        Self::Analyzer(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Whether the failure came from an external collaborator rather than bad input.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Browser(_) | Self::Analyzer(_) | Self::Model(_) | Self::Timeout { .. }
        )
    }
}
