//! Python virtual environment lifecycle: create-or-reuse, `pip show`, `pip install`.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::error::EnvError;
use super::PackageEnvironment;
use crate::common::{run_with_timeout, ProcessOutput};
use crate::info_log;

/// A materialized environment. `path` is always `base_dir/name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonEnv {
    pub name: String,
    pub base_dir: PathBuf,
    pub path: PathBuf,
    /// Interpreter inside the environment (`bin/python` or `Scripts/python.exe`)
    pub runner: PathBuf,
}

/// Owns one isolated package environment. Sole mutator of its installed set.
#[derive(Debug)]
pub struct EnvironmentManager {
    env: PythonEnv,
    timeout_secs: u64,
}

impl EnvironmentManager {
    /// Validate arguments and materialize the environment (create if absent,
    /// otherwise reuse what is on disk).
    pub fn new(
        name: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
        timeout_secs: u64,
    ) -> Result<Self, EnvError> {
        let name = name.as_ref();
        let base_dir = base_dir.as_ref();

        validate_name(name)?;
        if !base_dir.is_dir() {
            return Err(EnvError::Configuration(format!(
                "base directory {} does not exist or is not a directory",
                base_dir.display()
            )));
        }
        if timeout_secs < 1 {
            return Err(EnvError::Configuration(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        // Subprocesses run with `base_dir` as cwd; relative paths would resolve twice.
        let base_dir = std::path::absolute(base_dir).map_err(|e| {
            EnvError::Configuration(format!("cannot resolve {}: {}", base_dir.display(), e))
        })?;
        let path = env_path(&base_dir, name);
        let runner = materialize(&path, &base_dir)?;
        Ok(Self {
            env: PythonEnv {
                name: name.to_string_lossy().into_owned(),
                base_dir,
                path,
                runner,
            },
            timeout_secs,
        })
    }

    /// Re-run materialization. Never re-creates an existing environment, only
    /// re-resolves the runner.
    pub fn setup(&mut self) -> Result<&Path, EnvError> {
        self.env.runner = materialize(&self.env.path, &self.env.base_dir)?;
        Ok(&self.env.runner)
    }

    pub fn env(&self) -> &PythonEnv {
        &self.env
    }

    pub fn runner_path(&self) -> &Path {
        &self.env.runner
    }

    /// Return the subsequence of `packages` that is not installed.
    ///
    /// pip reports unknown names on stderr as `...not found: a, b`; those names
    /// are returned whatever the exit code. A failing exit without such a report
    /// is an [`EnvError::Installation`].
    pub fn check_installed(&self, packages: &[String]) -> Result<Vec<String>, EnvError> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }
        let out = self.pip("show", packages)?;
        let missing = parse_missing_packages(&out.stderr);
        if !missing.is_empty() {
            tracing::debug!("pip show reported missing: {:?}", missing);
            return Ok(missing);
        }
        if !out.success() {
            return Err(EnvError::Installation {
                stdout: out.stdout,
                stderr: out.stderr,
            });
        }
        Ok(Vec::new())
    }

    /// Install all `packages` in one pip call.
    pub fn install(&self, packages: &[String]) -> Result<(), EnvError> {
        if packages.is_empty() {
            return Ok(());
        }
        info_log!("pip install {}", packages.join(" "));
        let out = self.pip("install", packages)?;
        if !out.success() {
            return Err(EnvError::Installation {
                stdout: out.stdout,
                stderr: out.stderr,
            });
        }
        Ok(())
    }

    /// `<runner> -m pip <subcommand> <packages...>` under the time budget.
    fn pip(&self, subcommand: &str, packages: &[String]) -> Result<ProcessOutput, EnvError> {
        let command = format!("pip {}", subcommand);
        let mut cmd = Command::new(&self.env.runner);
        cmd.args(["-m", "pip", subcommand])
            .args(packages)
            .current_dir(&self.env.base_dir)
            .env("PIP_DISABLE_PIP_VERSION_CHECK", "1")
            .env("PIP_NO_INPUT", "1");

        let out = run_with_timeout(&mut cmd, Duration::from_secs(self.timeout_secs))
            .map_err(|source| EnvError::Io {
                command: command.clone(),
                source,
            })?;
        if out.timed_out {
            return Err(EnvError::Timeout {
                command,
                secs: self.timeout_secs,
            });
        }
        Ok(out)
    }
}

impl PackageEnvironment for EnvironmentManager {
    fn runner_path(&self) -> &Path {
        EnvironmentManager::runner_path(self)
    }

    fn check_installed(&self, packages: &[String]) -> Result<Vec<String>, EnvError> {
        EnvironmentManager::check_installed(self, packages)
    }

    fn install(&self, packages: &[String]) -> Result<(), EnvError> {
        EnvironmentManager::install(self, packages)
    }
}

/// Environment directory for (base_dir, name).
pub fn env_path(base_dir: &Path, name: &Path) -> PathBuf {
    base_dir.join(name)
}

/// Interpreter inside an environment directory, if it exists.
pub fn find_runner(env_dir: &Path) -> Option<PathBuf> {
    let unix = env_dir.join("bin").join("python");
    if unix.exists() {
        return Some(unix);
    }
    let windows = env_dir.join("Scripts").join("python.exe");
    if windows.exists() {
        return Some(windows);
    }
    None
}

/// Names pip could not find, parsed from `WARNING: Package(s) not found: a, b`.
pub fn parse_missing_packages(stderr: &str) -> Vec<String> {
    let Some(line) = stderr.lines().rev().find(|l| l.contains("not found:")) else {
        return Vec::new();
    };
    let names = line.rsplit(':').next().unwrap_or("");
    names
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// A name must be a non-empty relative path that stays below its base directory.
pub fn validate_name(name: &Path) -> Result<(), EnvError> {
    if name.as_os_str().is_empty() {
        return Err(EnvError::Configuration(
            "environment name must not be empty".to_string(),
        ));
    }
    if !name.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(EnvError::Configuration(format!(
            "environment name must be a relative path without `..`: {}",
            name.display()
        )));
    }
    Ok(())
}

/// Absent → create → Ready, ExistsOnDisk → resolve → Ready.
///
/// A directory without an interpreter (interrupted create) goes through the
/// create branch again; `venv` accepts an existing directory.
fn materialize(path: &Path, cwd: &Path) -> Result<PathBuf, EnvError> {
    materialize_with(path, cwd, which_python)
}

/// [`materialize`] with the base interpreter lookup supplied by the caller.
fn materialize_with(
    path: &Path,
    cwd: &Path,
    base_python: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf, EnvError> {
    if let Some(runner) = find_runner(path) {
        tracing::debug!("Reusing virtual environment at {}", path.display());
        return Ok(runner);
    }

    info_log!("Creating virtual environment at {}", path.display());
    let python = base_python().ok_or_else(|| EnvError::Venv {
        path: path.to_path_buf(),
        reason: "python3 or python not found in PATH".to_string(),
    })?;
    create_venv(&python, path, cwd)?;
    find_runner(path).ok_or_else(|| EnvError::Venv {
        path: path.to_path_buf(),
        reason: "no interpreter found after creation".to_string(),
    })
}

fn create_venv(python: &Path, path: &Path, cwd: &Path) -> Result<(), EnvError> {
    let out = Command::new(python)
        .arg("-m")
        .arg("venv")
        .arg(path)
        .current_dir(cwd)
        .output()
        .map_err(|source| EnvError::Io {
            command: format!("{} -m venv", python.display()),
            source,
        })?;
    if !out.status.success() {
        return Err(EnvError::Venv {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn which_python() -> Option<PathBuf> {
    ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
}
