//! Isolate the runnable Python program from LLM markdown output.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::install_intent::INSTALL_PREFIX;

/// Errors returned by snippet extraction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No Python code block found in the provided text")]
    NoCode,
}

/// Fence info strings accepted as Python.
const PYTHON_TAGS: &[&str] = &["python", "py", "python3"];

/// ```<tag><rest of info line>\n<body>```
static FENCE_RE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+.\-]*)[^\n]*\n(.*?)```").expect("fence regex")
    })
}

/// A fenced block: lower-cased language tag (may be empty) and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub body: String,
}

/// All fenced blocks in `text`, in order.
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    fence_re()
        .captures_iter(text)
        .map(|caps| CodeBlock {
            language: caps[1].to_lowercase(),
            body: caps[2].to_string(),
        })
        .collect()
}

/// Extract the Python program from `text`.
///
/// Blocks tagged `python`/`py`/`python3` are joined in order. Without any,
/// untagged blocks that are not `pip install` commands are used instead.
pub fn extract_code(text: &str) -> Result<String, ExtractError> {
    let blocks = code_blocks(text);

    let tagged: Vec<&str> = blocks
        .iter()
        .filter(|b| PYTHON_TAGS.contains(&b.language.as_str()))
        .map(|b| b.body.trim_end())
        .collect();
    let selected = if tagged.is_empty() {
        blocks
            .iter()
            .filter(|b| b.language.is_empty())
            .map(|b| b.body.trim_end())
            .filter(|body| !body.trim_start().starts_with(INSTALL_PREFIX))
            .collect()
    } else {
        tagged
    };

    let code = selected
        .into_iter()
        .filter(|body| !body.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if code.is_empty() {
        return Err(ExtractError::NoCode);
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_python_block() {
        let text = "Here you go:\n```python\nimport requests\nprint(1)\n```\nDone.";
        assert_eq!(extract_code(text).unwrap(), "import requests\nprint(1)");
    }

    #[test]
    fn test_joins_multiple_python_blocks_and_skips_shell() {
        let text = "```bash\npip install rich, httpx\n```\n```py\nx = 1\n```\ntext\n```Python\nprint(x)\n```";
        assert_eq!(extract_code(text).unwrap(), "x = 1\nprint(x)");
    }

    #[test]
    fn test_untagged_fallback_ignores_install_blocks() {
        let text = "```\npip install a, b\n```\n```\nprint('hi')\n```";
        assert_eq!(extract_code(text).unwrap(), "print('hi')");
    }

    #[test]
    fn test_no_code() {
        assert_eq!(extract_code("just prose"), Err(ExtractError::NoCode));
        assert_eq!(
            extract_code("```shell\npip install a, b\n```"),
            Err(ExtractError::NoCode)
        );
        assert_eq!(extract_code("```python\n\n```"), Err(ExtractError::NoCode));
    }

    #[test]
    fn test_code_blocks_languages() {
        let blocks = code_blocks("```sh\nls\n```\n```\nplain\n```");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "sh");
        assert_eq!(blocks[1].language, "");
        assert_eq!(blocks[1].body, "plain\n");
    }
}
