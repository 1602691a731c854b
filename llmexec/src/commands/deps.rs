//! `llmexec deps`: what a run would install, decided statically.

use anyhow::Result;
use serde_json::{json, Value};

use llmexec_core::extract::{extract_code, extract_dependencies, extract_packages, DEFAULT_DELIMITER};
use llmexec_core::packages::pip_name_for_module;

use crate::orchestrator::DependencySource;

/// Explicit intent, inferred imports and the source a run would use.
///
/// Standard-library filtering needs an interpreter, so `candidates` for the
/// inferred source still contains stdlib modules.
pub fn dependency_report(text: &str) -> Result<Value> {
    let intent = extract_packages(text, DEFAULT_DELIMITER);
    let code = extract_code(text)?;
    let imports = extract_dependencies(&code);

    let (source, candidates) = if intent.is_empty() {
        let names: Vec<String> = imports.iter().map(|m| pip_name_for_module(&m.module)).collect();
        (DependencySource::Inferred, names)
    } else {
        (DependencySource::Explicit, intent.clone())
    };

    Ok(json!({
        "intent": intent,
        "imports": imports,
        "source": source,
        "candidates": candidates,
    }))
}

pub fn cmd_deps(input: Option<&str>) -> Result<()> {
    let bytes = super::read_input(input)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| anyhow::anyhow!("Expected text argument to be a UTF-8 string"))?;
    let report = dependency_report(&text)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
