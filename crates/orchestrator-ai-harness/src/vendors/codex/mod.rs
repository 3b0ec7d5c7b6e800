//! Codex CLI integration (`codex exec --json`).
mod adapter;
mod dialect;

pub use adapter::CodexCli;
pub use dialect::{CodexDialect, CodexEvent, ItemPhase};
