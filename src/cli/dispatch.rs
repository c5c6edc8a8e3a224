use super::config::cmd_config;
use super::env::CliArgs;
use super::plan::cmd_plan;
use super::research::cmd_research;
use super::schema::cmd_schema;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Research(args) => cmd_research(args, ctx).await,
        Commands::Plan(args) => cmd_plan(args, ctx).await,
        Commands::Schema(args) => cmd_schema(args, ctx),
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
