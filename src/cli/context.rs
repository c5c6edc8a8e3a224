use std::path::{Path, PathBuf};

use crate::cli::output::OutputFormat;
use crate::config::AppConfig;

pub struct CliContext {
    config: AppConfig,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            output,
        }
    }

    /// Effective configuration: file contents plus environment overrides.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }
}
