///! Error types for semantic perceiver
use research_core::AgentError;
use thiserror::Error;

/// Errors that can occur while fetching or analyzing a page
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Fetch of {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Unsupported content type '{0}'")]
    UnsupportedContent(String),

    #[error("Language detection failed: {0}")]
    LanguageDetectionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis task failed: {0}")]
    Task(String),
}

/// Result type for semantic operations
pub type Result<T> = std::result::Result<T, SemanticError>;

impl From<SemanticError> for AgentError {
    fn from(err: SemanticError) -> Self {
        match err {
            SemanticError::Timeout { url, timeout_ms } => {
                AgentError::timeout(format!("fetch {url}"), timeout_ms)
            }
            other => AgentError::analyzer(other.to_string()),
        }
    }
}
