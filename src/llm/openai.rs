use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use research_core::{duration_ms, AgentError, GenerationRequest, StructuredGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::llm::utils::extract_json_object;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&LlmSettings> for OpenAiConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            api_keys: settings.api_keys.clone(),
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        }
    }
}

/// Chat-completions backend that answers in JSON mode.
///
/// The target schema travels in the system message; the reply is parsed
/// leniently (bare, fenced, or embedded object). On HTTP 429 the next API key
/// is tried.
pub struct OpenAiGenerator {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        if config.api_keys.is_empty() {
            return Err(AgentError::invalid_request(
                "missing OpenAI API key (set OPENAI_API_KEY or OPENAI_API_KEYS)",
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AgentError::model(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_message(request),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
        }
    }
}

fn system_message(request: &GenerationRequest) -> String {
    let schema = serde_json::to_string(&request.schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}\n\nRespond with one JSON object that conforms to the JSON Schema named {}:\n{}",
        request.system.trim_end(),
        request.schema_name,
        schema
    )
}

#[async_trait]
impl StructuredGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<JsonValue, AgentError> {
        let url = self.endpoint();
        let body = self.build_body(&request);

        let mut last_error: Option<AgentError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let response = match self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) if err.is_timeout() => {
                    return Err(AgentError::timeout(
                        format!("{} request", request.schema_name),
                        duration_ms(self.config.timeout),
                    ));
                }
                Err(err) => {
                    last_error = Some(AgentError::model(format!("openai request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = openai_rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        schema = %request.schema_name,
                        "OpenAI rate limited request; switching API key"
                    );
                    last_error = Some(AgentError::model(friendly));
                    continue;
                }
                return Err(AgentError::model(format!("openai returned {status}: {text}")));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| AgentError::model(format!("openai response invalid: {err}")))?;

            if let Some(usage) = &response.usage {
                debug!(
                    target: "openai",
                    schema = %request.schema_name,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "completion usage"
                );
            }

            let content = response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_ref())
                .and_then(ChatCompletionContent::as_text)
                .ok_or_else(|| AgentError::model("openai response missing content"))?;

            let json_string = extract_json_object(&content).ok_or_else(|| {
                AgentError::model(format!(
                    "openai response has no JSON object for {}",
                    request.schema_name
                ))
            })?;
            return serde_json::from_str(&json_string).map_err(|err| {
                AgentError::model(format!("failed to parse {} JSON: {err}", request.schema_name))
            });
        }

        Err(last_error
            .unwrap_or_else(|| AgentError::model("OpenAI request exhausted all API keys")))
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

fn openai_rate_limit_message(raw: &str) -> String {
    serde_json::from_str::<JsonValue>(raw)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|err| err.get("message"))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "OpenAI rate limit reached".to_string())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Debug, Deserialize)]
struct ChatContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(text) => Some(text.clone()),
            ChatCompletionContent::Parts(parts) => {
                let joined: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
                (!joined.is_empty()).then_some(joined)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
