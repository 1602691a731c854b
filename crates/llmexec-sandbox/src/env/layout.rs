//! On-disk executor tree: `base_dir/name/{logs/, scripts/is_standard_pkg.py}`.
//! The virtual environment lives next to them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::stdlib::{STANDARD_PKG_SCRIPT, STANDARD_PKG_SCRIPT_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorLayout {
    base_dir: PathBuf,
    root: PathBuf,
}

impl ExecutorLayout {
    /// Create the tree under `base_dir/name` if needed.
    ///
    /// Existing files are never rewritten; only missing directories and a
    /// missing helper script are (re)created, so a half-created tree heals on
    /// the next call.
    pub fn ensure(base_dir: &Path, name: &str) -> Result<Self> {
        let base_dir = std::path::absolute(base_dir)
            .with_context(|| format!("Resolve base directory {}", base_dir.display()))?;
        let layout = Self {
            root: base_dir.join(name),
            base_dir,
        };

        std::fs::create_dir_all(layout.logs_dir()).context("Create executor logs dir")?;
        std::fs::create_dir_all(layout.scripts_dir()).context("Create executor scripts dir")?;
        let script = layout.standard_pkg_script();
        if !script.exists() {
            std::fs::write(&script, STANDARD_PKG_SCRIPT)
                .with_context(|| format!("Write {}", script.display()))?;
        }
        Ok(layout)
    }

    /// Directory that holds the executor tree; also the working directory for runs.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("scripts")
    }

    pub fn standard_pkg_script(&self) -> PathBuf {
        self.scripts_dir().join(STANDARD_PKG_SCRIPT_NAME)
    }

    pub fn run_log(&self) -> PathBuf {
        self.logs_dir().join("runs.jsonl")
    }
}
