//! Claude CLI integration (`claude -p --output-format stream-json`).
mod adapter;
mod dialect;

pub use adapter::ClaudeCli;
pub use dialect::{ClaudeDialect, ClaudeEvent};
