//! llmexec library: orchestration of LLM-generated Python, plus the CLI.

mod cli;
mod commands;
pub mod diagnostic;
pub mod executor;
pub mod observability;
pub mod orchestrator;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use executor::Executor;
pub use orchestrator::{DependencyPlan, DependencySource, ExecutionOrchestrator, NotTextError};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

/// Parse arguments and dispatch to command handlers. Returns the exit code.
pub fn run_cli() -> Result<i32> {
    let cli = Cli::parse();
    let config = cli.executor.to_config();

    match cli.command {
        Commands::Run { input } => return commands::run::cmd_run(&config, input.as_deref()),
        Commands::Deps { input } => commands::deps::cmd_deps(input.as_deref())?,
        Commands::Check { packages } => commands::env::cmd_check(&config, &packages)?,
        Commands::Install { packages } => commands::env::cmd_install(&config, &packages)?,
        Commands::Env => commands::env::cmd_env(&config)?,
    }
    Ok(0)
}
