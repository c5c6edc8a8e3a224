pub mod openai;
mod utils;

use std::sync::Arc;

use research_core::{AgentError, MockGenerator, StructuredGenerator};

use crate::config::{LlmSettings, Provider};

pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use utils::extract_json_object;

/// Build the structured-generation backend named by `settings.provider`.
pub fn build_generator(settings: &LlmSettings) -> Result<Arc<dyn StructuredGenerator>, AgentError> {
    match settings.provider {
        Provider::Mock => Ok(Arc::new(MockGenerator::new())),
        Provider::Openai => Ok(Arc::new(OpenAiGenerator::new(OpenAiConfig::from(settings))?)),
    }
}
