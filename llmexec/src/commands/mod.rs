//! CLI command handlers.
//!
//!   run: orchestrate one text end to end
//!   deps: static dependency report, no environment
//!   env: check / install / show the environment

pub mod deps;
pub mod env;
pub mod run;

use anyhow::{Context, Result};
use std::io::Read;

/// Read the command input: a file path, or stdin for `-` / no argument.
pub fn read_input(input: Option<&str>) -> Result<Vec<u8>> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read {}", path)),
    }
}
