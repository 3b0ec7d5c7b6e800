//! Backend-specific integrations.
//!
//! Each vendor module owns its command-line construction and its event
//! grammar so the rest of the harness stays backend-agnostic.
pub mod claude;
pub mod codex;

use std::sync::Arc;

use crate::backend::BackendAdapter;
use crate::model::BackendKind;

/// Builds the adapter for `kind`, launching `program` (or the default binary).
pub fn adapter_for(kind: BackendKind, program: Option<&str>) -> Arc<dyn BackendAdapter> {
    let program = program
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(kind.default_program());
    match kind {
        BackendKind::Claude => Arc::new(claude::ClaudeCli::with_program(program)),
        BackendKind::Codex => Arc::new(codex::CodexCli::with_program(program)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_program_falls_back_to_default_binary() {
        let adapter = adapter_for(BackendKind::Codex, Some("  "));
        assert_eq!(adapter.program(), "codex");
        assert_eq!(adapter.id().as_str(), "codex");
        assert_eq!(adapter.dialect().name(), "codex-exec-json");
    }
}
