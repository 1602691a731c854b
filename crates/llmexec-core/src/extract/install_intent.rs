//! Explicit `pip install` intents embedded in LLM output.
//!
//! The text is split on a fence delimiter; shell-tagged blocks (and any
//! segment that already starts with `pip install`) are reduced to install
//! command lines, identical lines are dropped, and the comma-separated package
//! list of each line becomes the result.

/// Fenced code block marker used by LLM markdown output.
pub const DEFAULT_DELIMITER: &str = "```";

/// Literal prefix of an install command line.
pub const INSTALL_PREFIX: &str = "pip install";

/// Language tags that mark a console block. Matched in this order, first prefix wins.
const SHELL_TAGS: &[&str] = &["shell", "sh", "bash", "powershell", "ps1", "pwsh"];

/// Extract the package specs named by `pip install` commands in `text`.
///
/// Returns an empty list when `delimiter` never occurs in `text`.
pub fn extract_packages(text: &str, delimiter: &str) -> Vec<String> {
    let commands = install_commands(text, delimiter);
    packages_from_commands(&commands)
}

/// The deduplicated install command lines found in `text`, in first-occurrence order.
pub fn install_commands(text: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() || !text.contains(delimiter) {
        return Vec::new();
    }

    let mut joined = String::new();
    for segment in text.split(delimiter) {
        if let Some(command) = install_command(segment) {
            joined.push_str(&command);
            joined.push('\n');
        }
    }
    remove_repeated_lines(&joined)
        .into_iter()
        .filter(|line| line.starts_with(INSTALL_PREFIX))
        .collect()
}

/// Reduce one fenced segment to its install command, if it is one.
fn install_command(segment: &str) -> Option<String> {
    let mut code = segment.to_string();
    if let Some(tag) = SHELL_TAGS.iter().find(|t| segment.starts_with(**t)) {
        let rest = &segment[tag.len()..];
        code = unwrap_backticks(rest).unwrap_or(rest).trim().to_string();
    }
    code.starts_with(INSTALL_PREFIX).then_some(code)
}

/// Inner text of a single-line span wrapped in one pair of back-ticks.
fn unwrap_backticks(s: &str) -> Option<&str> {
    let line = s.strip_suffix('\n').unwrap_or(s);
    if line.len() < 2 || !line.starts_with('`') || !line.ends_with('`') {
        return None;
    }
    let inner = &line[1..line.len() - 1];
    (!inner.contains('\n')).then_some(inner)
}

/// Split into lines and keep only the first occurrence of each exact line.
fn remove_repeated_lines(text: &str) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for line in text.split('\n') {
        if !unique.iter().any(|u| u == line) {
            unique.push(line.to_string());
        }
    }
    unique
}

/// Turn install lines into package specs.
///
/// Only comma-separated lists are emitted: `pip install numpy` alone yields
/// nothing. Callers that need the single-package case fall back to import
/// inference.
fn packages_from_commands(commands: &[String]) -> Vec<String> {
    let mut packages = Vec::new();
    for line in commands {
        let Some(rest) = line.rsplit(INSTALL_PREFIX).next() else {
            continue;
        };
        let rest = rest.trim();
        if !rest.contains(',') {
            continue;
        }
        packages.extend(
            rest.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
        );
    }
    packages
}
