//! `llmexec run`

use anyhow::Result;

use llmexec_core::config::ExecutorConfig;

use crate::executor::Executor;

/// Execute the text read from `input`. Returns the process exit code.
pub fn cmd_run(config: &ExecutorConfig, input: Option<&str>) -> Result<i32> {
    let bytes = super::read_input(input)?;
    let orchestrator = Executor::open(config)?;
    match orchestrator.run_bytes(&bytes)? {
        Ok(output) => {
            println!("{}", output);
            Ok(0)
        }
        Err(diag) => {
            eprintln!("{}", diag);
            Ok(1)
        }
    }
}
