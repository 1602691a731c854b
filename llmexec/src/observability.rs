//! Observability: tracing init and the per-executor run log.
//!
//! Uses config::ObservabilityConfig for LLMEXEC_QUIET, LOG_LEVEL, LOG_JSON.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing_subscriber::{prelude::*, EnvFilter};

use llmexec_core::config::ObservabilityConfig;

use crate::diagnostic::Diagnostic;
use crate::orchestrator::DependencyPlan;

/// Initialize tracing. Call at process startup.
/// When LLMEXEC_QUIET=1 only WARN and above are logged. `RUST_LOG` overrides both.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "warn".to_string()
    } else {
        cfg.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // Logs go to stderr so stdout carries only the program result.
    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

/// Append-only JSONL file with one record per orchestrated run.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the outcome of one run. Write failures are logged, never raised.
    pub fn record(
        &self,
        run_id: &str,
        text: &str,
        plan: Option<&DependencyPlan>,
        installed: &[String],
        duration_ms: u64,
        outcome: Result<&str, &Diagnostic>,
    ) {
        let (status, kind, detail) = match outcome {
            Ok(_) => ("ok", None, None),
            Err(diag) => ("error", Some(diag.kind), Some(diag.message.as_str())),
        };
        let record = json!({
            "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": "run_completed",
            "run_id": run_id,
            "input_sha256": text_hash(text),
            "dependency_source": plan.map(|p| p.source),
            "dependencies": plan.map(|p| p.packages.clone()).unwrap_or_default(),
            "installed": installed,
            "duration_ms": duration_ms,
            "status": status,
            "diagnostic_kind": kind,
            "diagnostic": detail,
        });
        append_jsonl(&self.path, &record);
    }
}

fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn append_jsonl(path: &Path, record: &serde_json::Value) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut f) => {
            if let Ok(line) = serde_json::to_string(record) {
                if let Err(e) = writeln!(f, "{}", line) {
                    tracing::warn!("Failed to write run log {}: {}", path.display(), e);
                }
            }
        }
        Err(e) => tracing::warn!("Failed to open run log {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;
    use crate::orchestrator::DependencySource;

    #[test]
    fn test_records_are_appended_as_json_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let log = RunLog::new(tmp.path().join("logs").join("runs.jsonl"));
        let plan = DependencyPlan {
            source: DependencySource::Inferred,
            packages: vec!["requests".to_string()],
        };
        log.record("r1", "text", Some(&plan), &["requests".to_string()], 12, Ok("1"));
        let diag = Diagnostic {
            kind: DiagnosticKind::Installation,
            message: "pip reported a failure".to_string(),
            trace: String::new(),
        };
        log.record("r2", "text", None, &[], 3, Err(&diag));

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[0]["dependency_source"], "inferred");
        assert_eq!(lines[0]["installed"][0], "requests");
        assert_eq!(lines[0]["input_sha256"].as_str().unwrap().len(), 64);
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["diagnostic_kind"], "installation");
        assert!(lines[1]["dependency_source"].is_null());
    }
}
