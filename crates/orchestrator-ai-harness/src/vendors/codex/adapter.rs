use crate::backend::{BackendAdapter, CallRequest, CommandLine};
use crate::dialect::Dialect;
use crate::model::{BackendId, BackendKind, SandboxMode};

use super::dialect::CodexDialect;

const CODEX_BACKEND: &str = "codex";

/// Adapter for `codex exec`. The prompt is read from stdin (`-`).
#[derive(Clone, Debug)]
pub struct CodexCli {
    program: String,
    dialect: CodexDialect,
}

impl CodexCli {
    pub fn new() -> Self {
        Self::with_program(BackendKind::Codex.default_program())
    }

    /// Uses a specific executable path instead of `codex` from `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            dialect: CodexDialect,
        }
    }

    fn args(&self, request: &CallRequest, json: bool) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if json {
            args.push("--json".to_string());
        }
        if let Some(model) = &request.hints.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push("--sandbox".to_string());
        args.push(sandbox_flag(request.hints.sandbox).to_string());
        if let Some(session_id) = &request.resume_session_id {
            args.push("resume".to_string());
            args.push(session_id.clone());
        }
        args.push("-".to_string());
        args
    }
}

impl Default for CodexCli {
    fn default() -> Self {
        Self::new()
    }
}

fn sandbox_flag(sandbox: SandboxMode) -> &'static str {
    match sandbox {
        SandboxMode::ReadOnly => "read-only",
        SandboxMode::WorkspaceWrite => "workspace-write",
    }
}

impl BackendAdapter for CodexCli {
    fn id(&self) -> BackendId {
        BackendId::new(CODEX_BACKEND)
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn command(&self, request: &CallRequest) -> CommandLine {
        CommandLine {
            program: self.program.clone(),
            args: self.args(request, true),
            stdin: Some(request.prompt.clone()),
        }
    }

    /// Plain `exec` prints the final message as text.
    fn one_shot_command(&self, request: &CallRequest) -> Option<CommandLine> {
        Some(CommandLine {
            program: self.program.clone(),
            args: self.args(request, false),
            stdin: Some(request.prompt.clone()),
        })
    }
}
