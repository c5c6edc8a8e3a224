//! Application configuration.
//!
//! One YAML document with a section per collaborator. Missing sections and
//! fields fall back to defaults; a handful of environment variables override
//! what the file says.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use cdp_adapter::ChromiumConfig;
use perceiver_semantic::AnalyzerConfig;
use research_core::ResearchConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const ENV_MODEL: &str = "SOULRESEARCH_MODEL";
pub const ENV_PROVIDER: &str = "SOULRESEARCH_PROVIDER";
pub const ENV_API_BASE: &str = "SOULRESEARCH_API_BASE";
pub const ENV_HEADLESS: &str = "SOULRESEARCH_HEADLESS";
pub const ENV_CHROME: &str = "SOULRESEARCH_CHROME";
pub const ENV_API_KEYS: &str = "OPENAI_API_KEYS";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

const LOCAL_CONFIG: &str = "config/config.yaml";
const CONFIG_DIR_NAME: &str = "soulresearch";

/// Structured-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Openai,
    /// Deterministic offline backend.
    Mock,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Mock => "mock",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::Openai),
            "mock" => Ok(Provider::Mock),
            other => Err(format!("unknown provider '{other}' (expected openai or mock)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Never written to disk; filled from the environment.
    #[serde(skip)]
    pub api_keys: Vec<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
            api_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub research: ResearchConfig,
    pub llm: LlmSettings,
    pub browser: ChromiumConfig,
    pub analyzer: AnalyzerConfig,
}

pub struct LoadedConfig {
    pub config: AppConfig,
    /// The file the config came from, or the path that would have been used.
    pub path: PathBuf,
    pub from_file: bool,
}

/// `--config FILE`, then `./config/config.yaml`, then the user config dir.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|mut path| {
        path.push(CONFIG_DIR_NAME);
        path.push("config.yaml");
        path
    })
}

pub fn parse_config(raw: &str) -> Result<AppConfig> {
    if raw.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(raw).context("Failed to parse config file")
}

/// Load the config file (if any) and apply environment overrides.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = resolve_config_path(explicit).unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG));

    let (mut config, from_file) = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config =
            parse_config(&raw).with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded configuration from: {}", path.display());
        (config, true)
    } else {
        if explicit.is_some() {
            warn!("Config file not found, using defaults: {}", path.display());
        } else {
            debug!("Config file not found, using defaults: {}", path.display());
        }
        (AppConfig::default(), false)
    };

    apply_env_overrides(&mut config);
    Ok(LoadedConfig {
        config,
        path,
        from_file,
    })
}

/// Apply `SOULRESEARCH_*` overrides and read API keys.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(model) = non_empty_env(ENV_MODEL) {
        config.llm.model = model;
    }
    if let Some(raw) = non_empty_env(ENV_PROVIDER) {
        match raw.parse() {
            Ok(provider) => config.llm.provider = provider,
            Err(err) => warn!(%err, "ignoring {ENV_PROVIDER}"),
        }
    }
    if let Some(base) = non_empty_env(ENV_API_BASE) {
        config.llm.api_base = base;
    }
    if let Some(raw) = non_empty_env(ENV_HEADLESS) {
        config.browser.headless = !matches!(
            raw.to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        );
    }
    if let Some(chrome) = non_empty_env(ENV_CHROME) {
        config.browser.executable = Some(PathBuf::from(chrome));
    }
    config.llm.api_keys = api_keys_from_env();
}

/// `OPENAI_API_KEYS` (comma separated) wins over `OPENAI_API_KEY`.
pub fn api_keys_from_env() -> Vec<String> {
    if let Some(raw) = non_empty_env(ENV_API_KEYS) {
        let keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        if !keys.is_empty() {
            return keys;
        }
    }
    non_empty_env(ENV_API_KEY).into_iter().collect()
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
