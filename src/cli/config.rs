use std::path::Path;

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};
use crate::config::{parse_config, AppConfig};
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tracing::info;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Set a value in the configuration file
    Set {
        /// Dotted key, e.g. research.max_steps
        key: String,

        /// Value; parsed as JSON when possible
        value: String,
    },

    /// Get a value from the effective configuration
    Get {
        /// Dotted key, e.g. llm.model
        key: String,
    },

    /// Reset the configuration file to defaults
    Reset,

    /// Validate the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path().to_path_buf();
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = ctx.config();
            emit(config, ctx.output(), || {
                println!("Current configuration ({}):", path.display());
                print!("{}", serde_yaml::to_string(config).unwrap_or_default());
            })?;
        }
        ConfigAction::Set { key, value } => {
            let config = load_config_file(&path).await?;
            let mut json = serde_json::to_value(&config)?;
            let segments = split_key(&key)?;
            set_json_value(&mut json, &segments, parse_cli_value(&value))?;
            let config: AppConfig = serde_json::from_value(json)
                .with_context(|| format!("{key} does not accept {value}"))?;
            save_config_file(&path, &config).await?;
            info!("Updated configuration key {}", key);
            println!("Saved configuration to {}", path.display());
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(ctx.config())?;
            let segments = split_key(&key)?;
            let Some(value) = get_json_value(&json, &segments) else {
                bail!("{} not found in configuration", key);
            };
            match ctx.output() {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
                OutputFormat::Human => match value {
                    JsonValue::String(text) => println!("{text}"),
                    other => print!("{}", serde_yaml::to_string(other)?),
                },
            }
        }
        ConfigAction::Reset => {
            save_config_file(&path, &AppConfig::default()).await?;
            println!(
                "Configuration reset to defaults and written to {}",
                path.display()
            );
        }
        ConfigAction::Validate => {
            if fs::try_exists(&path).await? {
                let raw = fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                let config = parse_config(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?;
                check_budgets(&config)?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

/// Reject values the agent would silently clamp or loop on.
fn check_budgets(config: &AppConfig) -> Result<()> {
    let research = &config.research;
    if research.max_steps == 0 {
        bail!("research.max_steps must be at least 1");
    }
    if research.max_findings == 0 {
        bail!("research.max_findings must be at least 1");
    }
    if research.search_every == 0 || research.analysis_every == 0 {
        bail!("research.search_every and research.analysis_every must be at least 1");
    }
    if config.llm.model.trim().is_empty() {
        bail!("llm.model must not be empty");
    }
    Ok(())
}

async fn load_config_file(path: &Path) -> Result<AppConfig> {
    if fs::try_exists(path).await? {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        parse_config(&raw).with_context(|| format!("parsing {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

async fn save_config_file(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let serialized = serde_yaml::to_string(config)?;
    fs::write(path, serialized)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn parse_cli_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn set_json_value(target: &mut JsonValue, path: &[&str], value: JsonValue) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        bail!("configuration key cannot be empty");
    };
    let mut current = target;
    for segment in parents {
        current = ensure_object(current, segment)?
            .entry((*segment).to_string())
            .or_insert(JsonValue::Null);
    }
    ensure_object(current, last)?.insert((*last).to_string(), value);
    Ok(())
}

fn ensure_object<'a>(
    value: &'a mut JsonValue,
    segment: &str,
) -> Result<&'a mut Map<String, JsonValue>> {
    if value.is_null() {
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => bail!(
            "{} resolves to a non-object value; cannot assign nested configuration",
            segment
        ),
    }
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}
