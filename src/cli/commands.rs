use clap::Subcommand;

use super::config::ConfigArgs;
use super::plan::PlanArgs;
use super::research::ResearchArgs;
use super::schema::SchemaArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Plan and run a research task in a real browser
    Research(ResearchArgs),

    /// Generate a research plan without opening a browser
    Plan(PlanArgs),

    /// Print the JSON Schema of a structured model output
    Schema(SchemaArgs),

    /// Inspect or edit the configuration file
    Config(ConfigArgs),
}
