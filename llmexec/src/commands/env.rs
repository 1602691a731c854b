//! Environment commands: `check`, `install`, `env`.

use anyhow::Result;

use llmexec_core::config::ExecutorConfig;

use crate::executor::Executor;

/// `llmexec check`: print each missing package on its own line.
pub fn cmd_check(config: &ExecutorConfig, packages: &[String]) -> Result<()> {
    let (_, manager) = Executor::open_environment(config)?;
    let missing = manager.check_installed(packages)?;
    if missing.is_empty() {
        eprintln!("All {} package(s) installed", packages.len());
    }
    for name in &missing {
        println!("{}", name);
    }
    Ok(())
}

/// `llmexec install`: install only what is missing.
pub fn cmd_install(config: &ExecutorConfig, packages: &[String]) -> Result<()> {
    let (_, manager) = Executor::open_environment(config)?;
    let missing = manager.check_installed(packages)?;
    if missing.is_empty() {
        eprintln!("Nothing to install");
        return Ok(());
    }
    manager.install(&missing)?;
    eprintln!("Installed: {}", missing.join(", "));
    Ok(())
}

/// `llmexec env`
pub fn cmd_env(config: &ExecutorConfig) -> Result<()> {
    let (_, manager) = Executor::open_environment(config)?;
    println!("{}", serde_json::to_string_pretty(manager.env())?);
    Ok(())
}
