use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputFormat::Human)
    }
}

/// Print `payload` as JSON or YAML, or run `human` for the text format.
pub fn emit<T, F>(payload: &T, format: OutputFormat, human: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(payload)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(payload)?),
        OutputFormat::Human => human(),
    }
    Ok(())
}
