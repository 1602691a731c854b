//! Execution orchestration: text → dependencies → reconcile → run.
//!
//! Explicit `pip install` intent wins; only without it are imports inferred,
//! filtered against the environment's standard library, and mapped to pip
//! names. Reconciliation checks before it installs, so repeated runs with the
//! same dependencies never invoke the installer again.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

use llmexec_core::extract::{
    extract_code, extract_dependencies, extract_packages, DEFAULT_DELIMITER,
};
use llmexec_core::packages::pip_name_for_module;
use llmexec_sandbox::env::PackageEnvironment;
use llmexec_sandbox::info_log;
use llmexec_sandbox::runner::CodeRunner;
use llmexec_sandbox::stdlib::StdlibClassifier;

use crate::diagnostic::Diagnostic;
use crate::observability::RunLog;

/// Raw input was not text. Returned before any side effect.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Expected text argument to be a UTF-8 string (invalid byte at offset {valid_up_to})")]
pub struct NotTextError {
    pub valid_up_to: usize,
}

/// Where the dependency set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencySource {
    /// `pip install` commands in the text
    Explicit,
    /// Imports of the snippet minus the standard library
    Inferred,
}

/// The decided dependency set. `packages` holds no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyPlan {
    pub source: DependencySource,
    pub packages: Vec<String>,
}

/// Top-level coordinator for one environment.
pub struct ExecutionOrchestrator {
    env: Box<dyn PackageEnvironment>,
    classifier: Box<dyn StdlibClassifier>,
    runner: Box<dyn CodeRunner>,
    working_dir: PathBuf,
    run_log: Option<RunLog>,
}

/// Per-run bookkeeping for the run log.
#[derive(Default)]
struct RunState {
    plan: Option<DependencyPlan>,
    installed: Vec<String>,
}

impl ExecutionOrchestrator {
    pub fn new(
        env: Box<dyn PackageEnvironment>,
        classifier: Box<dyn StdlibClassifier>,
        runner: Box<dyn CodeRunner>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            env,
            classifier,
            runner,
            working_dir: working_dir.into(),
            run_log: None,
        }
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn environment(&self) -> &dyn PackageEnvironment {
        self.env.as_ref()
    }

    /// Execute the program embedded in `text`.
    ///
    /// Never panics or propagates pipeline errors: every failure comes back as
    /// a [`Diagnostic`], already logged with its full trace.
    pub fn run(&self, text: &str) -> Result<String, Diagnostic> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();
        let mut state = RunState::default();
        info_log!("LLM generated text:\n{}", text);

        let outcome = self.pipeline(text, &mut state).map_err(|e| {
            let diag = Diagnostic::from_error(&e);
            tracing::error!(kind = %diag.kind, "{}\n{}", crate::diagnostic::DIAGNOSTIC_MARKER, diag.trace);
            diag
        });

        if let Some(log) = &self.run_log {
            log.record(
                &run_id,
                text,
                state.plan.as_ref(),
                &state.installed,
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                outcome.as_deref(),
            );
        }
        outcome
    }

    /// Type guard for raw input: non-UTF-8 bytes are rejected before anything runs.
    pub fn run_bytes(&self, input: &[u8]) -> Result<Result<String, Diagnostic>, NotTextError> {
        let text = std::str::from_utf8(input).map_err(|e| {
            tracing::error!("Expected text argument to be a UTF-8 string");
            NotTextError {
                valid_up_to: e.valid_up_to(),
            }
        })?;
        Ok(self.run(text))
    }

    /// Like [`run`](Self::run) but always a string: the output or the rendered diagnostic.
    pub fn run_to_string(&self, text: &str) -> String {
        match self.run(text) {
            Ok(output) => output,
            Err(diag) => diag.to_string(),
        }
    }

    /// Decide the dependency set for `code` given the explicit intent.
    pub fn resolve_dependencies(&self, explicit: &[String], code: &str) -> Result<DependencyPlan> {
        if !explicit.is_empty() {
            return Ok(DependencyPlan {
                source: DependencySource::Explicit,
                packages: dedup(explicit.iter().cloned()),
            });
        }

        let imports = extract_dependencies(code);
        info_log!(
            "Python code dependencies: {:?}",
            imports.iter().map(|m| m.module.as_str()).collect::<Vec<_>>()
        );
        if imports.is_empty() {
            return Ok(DependencyPlan {
                source: DependencySource::Inferred,
                packages: Vec::new(),
            });
        }

        let standard = self
            .classifier
            .standard_modules(self.env.runner_path())
            .context("Classify standard-library modules")?;
        let packages = dedup(
            imports
                .into_iter()
                .filter(|m| !standard.contains(&m.module))
                .map(|m| pip_name_for_module(&m.module)),
        );
        Ok(DependencyPlan {
            source: DependencySource::Inferred,
            packages,
        })
    }

    fn pipeline(&self, text: &str, state: &mut RunState) -> Result<String> {
        let explicit = extract_packages(text, DEFAULT_DELIMITER);
        info_log!("Explicit install intent: {:?}", explicit);

        let code = extract_code(text)?;
        info_log!("Extracted Python code:\n{}", code);

        let plan = self.resolve_dependencies(&explicit, &code)?;
        state.plan = Some(plan.clone());

        if plan.packages.is_empty() {
            info_log!("No installation needed");
        } else {
            info_log!("Checking installed packages: {:?}", plan.packages);
            let missing = self.env.check_installed(&plan.packages)?;
            if missing.is_empty() {
                info_log!("All dependencies already installed");
            } else {
                info_log!("Installing missing dependencies: {:?}", missing);
                self.env.install(&missing)?;
                info_log!("Installation completed");
                state.installed = missing;
            }
        }

        let output = self
            .runner
            .execute(self.env.runner_path(), &code, &self.working_dir)?;
        let result = output.stdout.trim_end_matches(['\n', '\r']).to_string();
        info_log!("Code execution result:\n{}", result);
        Ok(result)
    }
}

/// Order-preserving de-duplication.
fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{DiagnosticKind, DIAGNOSTIC_MARKER};
    use llmexec_sandbox::env::EnvError;
    use llmexec_sandbox::runner::{ExecutionOutput, RunError};
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    struct FakeEnv {
        runner: PathBuf,
        installed: Mutex<HashSet<String>>,
        fail_install: bool,
        calls: Calls,
    }

    impl PackageEnvironment for FakeEnv {
        fn runner_path(&self) -> &Path {
            &self.runner
        }

        fn check_installed(&self, packages: &[String]) -> Result<Vec<String>, EnvError> {
            self.calls.lock().unwrap().push(format!("check {}", packages.join(",")));
            let installed = self.installed.lock().unwrap();
            Ok(packages.iter().filter(|p| !installed.contains(*p)).cloned().collect())
        }

        fn install(&self, packages: &[String]) -> Result<(), EnvError> {
            self.calls.lock().unwrap().push(format!("install {}", packages.join(",")));
            if self.fail_install {
                return Err(EnvError::Installation {
                    stdout: String::new(),
                    stderr: "ERROR: No matching distribution".to_string(),
                });
            }
            self.installed.lock().unwrap().extend(packages.iter().cloned());
            Ok(())
        }
    }

    struct FakeClassifier {
        fail: bool,
        calls: Calls,
    }

    impl StdlibClassifier for FakeClassifier {
        fn standard_modules(&self, runner: &Path) -> Result<HashSet<String>> {
            self.calls.lock().unwrap().push(format!("classify {}", runner.display()));
            if self.fail {
                anyhow::bail!("classifier crashed");
            }
            Ok(["os", "sys", "json"].iter().map(|s| s.to_string()).collect())
        }
    }

    struct FakeRunner {
        result: fn() -> Result<ExecutionOutput, RunError>,
        calls: Calls,
    }

    impl CodeRunner for FakeRunner {
        fn execute(&self, runner: &Path, code: &str, working_dir: &Path) -> Result<ExecutionOutput, RunError> {
            self.calls.lock().unwrap().push(format!(
                "execute {} in {} ({} bytes)",
                runner.display(),
                working_dir.display(),
                code.len()
            ));
            (self.result)()
        }
    }

    fn prints_one() -> Result<ExecutionOutput, RunError> {
        Ok(ExecutionOutput {
            stdout: "1\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    struct Harness {
        orchestrator: ExecutionOrchestrator,
        calls: Calls,
    }

    impl Harness {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn installs(&self) -> Vec<String> {
            self.calls().into_iter().filter(|c| c.starts_with("install")).collect()
        }
    }

    fn harness(
        installed: &[&str],
        fail_install: bool,
        fail_classifier: bool,
        result: fn() -> Result<ExecutionOutput, RunError>,
    ) -> Harness {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let env = FakeEnv {
            runner: PathBuf::from("/env/bin/python"),
            installed: Mutex::new(installed.iter().map(|s| s.to_string()).collect()),
            fail_install,
            calls: calls.clone(),
        };
        let classifier = FakeClassifier {
            fail: fail_classifier,
            calls: calls.clone(),
        };
        let runner = FakeRunner {
            result,
            calls: calls.clone(),
        };
        Harness {
            orchestrator: ExecutionOrchestrator::new(
                Box::new(env),
                Box::new(classifier),
                Box::new(runner),
                "/work",
            ),
            calls,
        }
    }

    #[test]
    fn test_end_to_end_inferred_dependency_installed_once() {
        let h = harness(&[], false, false, prints_one);
        let text = "```python\nimport requests\nprint(1)\n```";

        assert_eq!(h.orchestrator.run(text).unwrap(), "1");
        assert_eq!(
            h.calls(),
            vec![
                "classify /env/bin/python".to_string(),
                "check requests".to_string(),
                "install requests".to_string(),
                format!("execute /env/bin/python in /work ({} bytes)", "import requests\nprint(1)".len()),
            ]
        );

        // Second run: already installed, the installer is not invoked again.
        assert_eq!(h.orchestrator.run(text).unwrap(), "1");
        assert_eq!(h.installs(), vec!["install requests"]);
    }

    #[test]
    fn test_explicit_intent_supersedes_imports() {
        let h = harness(&[], false, false, prints_one);
        let text = "```shell\npip install numpy, pandas\n```\n```python\nimport c\nimport requests\nprint(1)\n```";

        let plan = h
            .orchestrator
            .resolve_dependencies(&extract_packages(text, DEFAULT_DELIMITER), "import c")
            .unwrap();
        assert_eq!(plan.source, DependencySource::Explicit);
        assert_eq!(plan.packages, vec!["numpy", "pandas"]);

        h.orchestrator.run(text).unwrap();
        assert!(h.calls().iter().all(|c| !c.starts_with("classify")));
        assert_eq!(h.installs(), vec!["install numpy,pandas"]);
    }

    #[test]
    fn test_explicit_intent_is_not_stdlib_filtered_and_is_deduplicated() {
        let h = harness(&[], false, false, prints_one);
        let plan = h
            .orchestrator
            .resolve_dependencies(
                &["json".to_string(), "a".to_string(), "json".to_string()],
                "",
            )
            .unwrap();
        assert_eq!(plan.packages, vec!["json", "a"]);
    }

    #[test]
    fn test_fallback_filters_standard_modules_and_maps_aliases() {
        let h = harness(&[], false, false, prints_one);
        let plan = h
            .orchestrator
            .resolve_dependencies(&[], "import os\nimport requests\nfrom PIL import Image\nimport requests.adapters")
            .unwrap();
        assert_eq!(plan.source, DependencySource::Inferred);
        assert_eq!(plan.packages, vec!["requests", "pillow"]);
    }

    #[test]
    fn test_no_dependencies_skips_reconciliation_and_classifier() {
        let h = harness(&[], false, false, prints_one);
        assert_eq!(h.orchestrator.run("```python\nprint(1)\n```").unwrap(), "1");
        assert!(h.calls().iter().all(|c| c.starts_with("execute")));

        let h = harness(&[], false, false, prints_one);
        h.orchestrator.run("```python\nimport os, sys\nprint(1)\n```").unwrap();
        let calls = h.calls();
        assert!(calls.iter().all(|c| !c.starts_with("check") && !c.starts_with("install")));
    }

    #[test]
    fn test_check_before_install() {
        let h = harness(&["requests"], false, false, prints_one);
        h.orchestrator.run("```python\nimport requests\nprint(1)\n```").unwrap();
        assert!(h.calls().contains(&"check requests".to_string()));
        assert!(h.installs().is_empty());
    }

    #[test]
    fn test_only_missing_packages_installed() {
        let h = harness(&["numpy"], false, false, prints_one);
        h.orchestrator
            .run("```sh\npip install numpy, pandas\n```\n```python\nprint(1)\n```")
            .unwrap();
        assert_eq!(h.installs(), vec!["install pandas"]);
    }

    #[test]
    fn test_failures_become_diagnostics() {
        // Extractor: no code.
        let h = harness(&[], false, false, prints_one);
        let diag = h.orchestrator.run("no code here").unwrap_err();
        assert_eq!(diag.kind, DiagnosticKind::Extraction);
        assert!(h.calls().is_empty());

        // Classifier raises.
        let h = harness(&[], false, true, prints_one);
        let diag = h.orchestrator.run("```python\nimport requests\n```").unwrap_err();
        assert_eq!(diag.kind, DiagnosticKind::Unexpected);
        assert!(diag.trace.contains("classifier crashed"));

        // Installer raises; the snippet never runs.
        let h = harness(&[], true, false, prints_one);
        let diag = h.orchestrator.run("```python\nimport requests\n```").unwrap_err();
        assert_eq!(diag.kind, DiagnosticKind::Installation);
        assert!(h.calls().iter().all(|c| !c.starts_with("execute")));

        // Execution fails / times out.
        let h = harness(&[], false, false, || {
            Err(RunError::Failed {
                exit_code: 1,
                stdout: String::new(),
                stderr: "ZeroDivisionError: division by zero".to_string(),
            })
        });
        let diag = h.orchestrator.run("```python\n1/0\n```").unwrap_err();
        assert_eq!(diag.kind, DiagnosticKind::Execution);
        assert!(diag.to_string().starts_with(DIAGNOSTIC_MARKER));
        assert!(diag.to_string().contains("ZeroDivisionError"));

        let h = harness(&[], false, false, || Err(RunError::Timeout { secs: 30 }));
        let diag = h.orchestrator.run("```python\nwhile True: pass\n```").unwrap_err();
        assert_eq!(diag.kind, DiagnosticKind::Timeout);
    }

    #[test]
    fn test_run_to_string_always_returns_text() {
        let h = harness(&[], true, false, prints_one);
        let out = h.orchestrator.run_to_string("```python\nimport requests\n```");
        assert!(out.starts_with(DIAGNOSTIC_MARKER));

        let h = harness(&[], false, false, prints_one);
        assert_eq!(h.orchestrator.run_to_string("```python\nprint(1)\n```"), "1");
    }

    #[test]
    fn test_non_text_input_is_rejected_without_side_effects() {
        let h = harness(&[], false, false, prints_one);
        let err = h.orchestrator.run_bytes(&[b'a', 0xff, 0xfe]).unwrap_err();
        assert_eq!(err, NotTextError { valid_up_to: 1 });
        assert!(h.calls().is_empty());

        let ok = h.orchestrator.run_bytes(b"```python\nprint(1)\n```").unwrap();
        assert_eq!(ok.unwrap(), "1");
    }

    #[test]
    fn test_run_log_written_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let log_path = tmp.path().join("runs.jsonl");
        let h = harness(&[], false, false, prints_one);
        let orchestrator = h.orchestrator.with_run_log(RunLog::new(&log_path));

        orchestrator.run("```python\nimport requests\nprint(1)\n```").unwrap();
        orchestrator.run("nothing").unwrap_err();

        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&log_path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["installed"][0], "requests");
        assert_eq!(lines[0]["dependencies"][0], "requests");
        assert_eq!(lines[1]["diagnostic_kind"], "extraction");
        assert!(lines.iter().all(|l| l["duration_ms"].is_u64()));
    }
}
