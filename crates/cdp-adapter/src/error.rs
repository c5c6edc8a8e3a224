use research_core::AgentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("chrome executable not found; set browser.executable or SOULRESEARCH_CHROME")]
    ExecutableNotFound,

    #[error("chrome executable not found at {0}")]
    MissingExecutable(String),

    #[error("browser config error: {0}")]
    Config(String),

    #[error("failed to launch chromium: {0}")]
    Launch(String),

    #[error("{operation} failed: {message}")]
    Protocol {
        operation: &'static str,
        message: String,
    },

    #[error("no element matches selector '{0}'")]
    NoElement(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser session is closed")]
    Closed,
}

impl CdpError {
    pub fn protocol(operation: &'static str, err: impl std::fmt::Display) -> Self {
        CdpError::Protocol {
            operation,
            message: err.to_string(),
        }
    }
}

impl From<CdpError> for AgentError {
    fn from(err: CdpError) -> Self {
        AgentError::browser(err.to_string())
    }
}
