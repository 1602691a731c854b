//! Standard-library classification, answered by the target environment's own
//! interpreter so the result matches the Python version that will run the code.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use crate::common::run_with_timeout;

/// File name of the helper script inside the executor's `scripts/` directory.
pub const STANDARD_PKG_SCRIPT_NAME: &str = "is_standard_pkg.py";

/// Prints a JSON array with every module name that ships with the interpreter.
pub const STANDARD_PKG_SCRIPT: &str = r#"import json
import sys

names = set(sys.builtin_module_names)
stdlib_names = getattr(sys, "stdlib_module_names", None)
if stdlib_names:
    names.update(stdlib_names)
else:
    import os
    import pkgutil
    import sysconfig

    stdlib = sysconfig.get_paths()["stdlib"]
    search = [stdlib, os.path.join(stdlib, "lib-dynload")]
    names.update(m.name for m in pkgutil.iter_modules(search))

print(json.dumps(sorted(names)))
"#;

/// Decides which module names need no installation.
pub trait StdlibClassifier: Send + Sync {
    /// Module names that belong to the base distribution of `runner`.
    fn standard_modules(&self, runner: &Path) -> Result<HashSet<String>>;
}

/// Runs [`STANDARD_PKG_SCRIPT`] with the environment interpreter. Results are
/// cached per interpreter path for the lifetime of the classifier.
#[derive(Debug)]
pub struct ScriptClassifier {
    script: PathBuf,
    working_dir: PathBuf,
    timeout: Duration,
    cache: Mutex<HashMap<PathBuf, HashSet<String>>>,
}

impl ScriptClassifier {
    pub fn new(script: impl Into<PathBuf>, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            script: script.into(),
            working_dir: working_dir.into(),
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl StdlibClassifier for ScriptClassifier {
    fn standard_modules(&self, runner: &Path) -> Result<HashSet<String>> {
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(runner).cloned()) {
            return Ok(hit);
        }
        let names = standard_modules(runner, &self.script, &self.working_dir, self.timeout)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(runner.to_path_buf(), names.clone());
        }
        Ok(names)
    }
}

/// Run the classifier script with `runner` in `working_dir` and parse its output.
pub fn standard_modules(
    runner: &Path,
    script: &Path,
    working_dir: &Path,
    timeout: Duration,
) -> Result<HashSet<String>> {
    let out = run_with_timeout(
        Command::new(runner).arg(script).current_dir(working_dir),
        timeout,
    )
    .with_context(|| format!("Failed to run standard-library classifier with {}", runner.display()))?;
    if out.timed_out {
        anyhow::bail!(
            "Standard-library classifier timed out after {} seconds",
            timeout.as_secs()
        );
    }
    if !out.success() {
        anyhow::bail!(
            "Standard-library classifier exited with code {}: {}",
            out.exit_code,
            out.stderr.trim()
        );
    }
    parse_standard_modules(&out.stdout)
}

/// Parse the JSON array printed by the classifier script.
pub fn parse_standard_modules(stdout: &str) -> Result<HashSet<String>> {
    let names: Vec<String> = serde_json::from_str(stdout.trim())
        .context("Standard-library classifier printed invalid JSON")?;
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_modules() {
        let names = parse_standard_modules("[\"os\", \"sys\", \"json\"]\n").unwrap();
        assert!(names.contains("os"));
        assert!(names.contains("json"));
        assert!(!names.contains("requests"));
        assert!(parse_standard_modules("Traceback ...").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_script_classifier_runs_and_caches() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("classify.sh");
        let marker = tmp.path().join("calls");
        std::fs::write(
            &script,
            format!("echo x >> {}\necho '[\"os\", \"sys\"]'\n", marker.display()),
        )
        .unwrap();

        let classifier = ScriptClassifier::new(&script, tmp.path(), Duration::from_secs(5));
        let sh = Path::new("/bin/sh");
        let first = classifier.standard_modules(sh).unwrap();
        let second = classifier.standard_modules(sh).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("os"));
        assert_eq!(std::fs::read_to_string(&marker).unwrap().lines().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_classifier_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fail.sh");
        std::fs::write(&script, "echo nope >&2\nexit 4\n").unwrap();
        let err = standard_modules(Path::new("/bin/sh"), &script, tmp.path(), Duration::from_secs(5))
            .unwrap_err();
        assert!(err.to_string().contains("exited with code 4"));
    }
}
