//! Text extraction from LLM output: install intents, the Python snippet, and
//! the modules it imports. Pure functions, no I/O.

pub mod code;
pub mod imports;
pub mod install_intent;

pub use code::{extract_code, ExtractError};
pub use imports::{extract_dependencies, ImportedModule};
pub use install_intent::{extract_packages, install_commands, DEFAULT_DELIMITER};
