//! Typed failure result of one orchestrated run.

use serde::Serialize;
use std::fmt;

use llmexec_core::extract::ExtractError;
use llmexec_sandbox::env::EnvError;
use llmexec_sandbox::runner::RunError;

/// First line of every rendered diagnostic.
pub const DIAGNOSTIC_MARKER: &str = "Error occurred during code execution:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// pip show / pip install or the snippet exceeded its time budget
    Timeout,
    /// pip reported a failure
    Installation,
    /// no runnable snippet in the text
    Extraction,
    /// the snippet ran and failed
    Execution,
    Unexpected,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Installation => write!(f, "installation"),
            Self::Extraction => write!(f, "extraction"),
            Self::Execution => write!(f, "execution"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// What went wrong, as data. `Display` renders the marker line plus the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// One-line summary including causes
    pub message: String,
    /// Full error chain (and backtrace, when captured)
    pub trace: String,
}

impl Diagnostic {
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            kind: classify(err),
            message: format!("{:#}", err),
            trace: format!("{:?}", err),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", DIAGNOSTIC_MARKER, self.trace)
    }
}

impl std::error::Error for Diagnostic {}

fn classify(err: &anyhow::Error) -> DiagnosticKind {
    for cause in err.chain() {
        if let Some(env_err) = cause.downcast_ref::<EnvError>() {
            return match env_err {
                EnvError::Timeout { .. } => DiagnosticKind::Timeout,
                EnvError::Installation { .. } => DiagnosticKind::Installation,
                _ => DiagnosticKind::Unexpected,
            };
        }
        if let Some(run_err) = cause.downcast_ref::<RunError>() {
            return match run_err {
                RunError::Timeout { .. } => DiagnosticKind::Timeout,
                RunError::Failed { .. } => DiagnosticKind::Execution,
                _ => DiagnosticKind::Unexpected,
            };
        }
        if cause.downcast_ref::<ExtractError>().is_some() {
            return DiagnosticKind::Extraction;
        }
    }
    DiagnosticKind::Unexpected
}
