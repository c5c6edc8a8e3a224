use anyhow::Result;
use clap::{Args, ValueEnum};
use research_core::{action_schema, plan_schema};

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct SchemaArgs {
    /// Which structured output to describe
    #[arg(value_enum, default_value = "plan")]
    pub kind: SchemaKind,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SchemaKind {
    /// Research plan produced by the planner
    Plan,
    /// Single tool action chosen by the decision engine
    Action,
}

pub fn cmd_schema(args: SchemaArgs, ctx: &CliContext) -> Result<()> {
    let schema = match args.kind {
        SchemaKind::Plan => plan_schema(),
        SchemaKind::Action => action_schema(),
    };
    match ctx.output() {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&schema)?),
        // schemas are JSON documents; the human format prints them as-is
        OutputFormat::Json | OutputFormat::Human => {
            println!("{}", serde_json::to_string_pretty(&schema)?)
        }
    }
    Ok(())
}
