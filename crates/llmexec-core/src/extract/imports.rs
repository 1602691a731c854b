//! Static import inference for Python snippets.
//!
//! Line-based: handles `import a.b as c, d`, `from x.y import z` and several
//! statements joined by `;`. Only the top-level package name matters for
//! installation, so `a.b` yields `a`.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// One imported top-level module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImportedModule {
    pub module: String,
}

static IMPORT_RE: OnceLock<Regex> = OnceLock::new();
static FROM_RE: OnceLock<Regex> = OnceLock::new();

fn import_re() -> &'static Regex {
    IMPORT_RE.get_or_init(|| Regex::new(r"^\s*import\s+(.+)$").expect("import regex"))
}

fn from_re() -> &'static Regex {
    FROM_RE.get_or_init(|| {
        Regex::new(r"^\s*from\s+(\.*)([A-Za-z_][\w.]*)?\s+import\b").expect("from regex")
    })
}

/// Top-level modules imported by `code`, deduplicated, first occurrence first.
/// Relative imports are skipped.
pub fn extract_dependencies(code: &str) -> Vec<ImportedModule> {
    let mut modules: Vec<ImportedModule> = Vec::new();
    let mut push = |name: &str| {
        let top = name.split('.').next().unwrap_or("").trim();
        if is_identifier(top) && !modules.iter().any(|m| m.module == top) {
            modules.push(ImportedModule {
                module: top.to_string(),
            });
        }
    };

    for raw in code.lines() {
        let line = strip_comment(raw);
        // `import a; import b` on one line
        for stmt in line.split(';') {
            if let Some(caps) = from_re().captures(stmt) {
                if caps.get(1).map_or(false, |dots| !dots.as_str().is_empty()) {
                    continue;
                }
                if let Some(module) = caps.get(2) {
                    push(module.as_str());
                }
            } else if let Some(caps) = import_re().captures(stmt) {
                for item in caps[1].split(',') {
                    let name = item.split_whitespace().next().unwrap_or("");
                    push(name);
                }
            }
        }
    }
    modules
}

/// Drop a trailing `# comment`. Quotes are not tracked; import lines rarely carry strings.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}
