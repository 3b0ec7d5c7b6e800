use crate::backend::{BackendAdapter, CallRequest, CommandLine};
use crate::dialect::Dialect;
use crate::model::{BackendId, BackendKind, SandboxMode};

use super::dialect::ClaudeDialect;

const CLAUDE_BACKEND: &str = "claude";

/// Adapter for the `claude` CLI in print mode. The prompt goes over stdin.
#[derive(Clone, Debug)]
pub struct ClaudeCli {
    program: String,
    dialect: ClaudeDialect,
}

impl ClaudeCli {
    pub fn new() -> Self {
        Self::with_program(BackendKind::Claude.default_program())
    }

    /// Uses a specific executable path instead of `claude` from `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            dialect: ClaudeDialect,
        }
    }

    fn args(&self, request: &CallRequest, output_format: &str) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            output_format.to_string(),
        ];
        if output_format == "stream-json" {
            // stream-json is rejected in print mode without --verbose.
            args.push("--verbose".to_string());
        }
        if let Some(model) = &request.hints.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push("--permission-mode".to_string());
        args.push(permission_mode(request.hints.sandbox).to_string());
        if let Some(session_id) = &request.resume_session_id {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }
        args
    }
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self::new()
    }
}

fn permission_mode(sandbox: SandboxMode) -> &'static str {
    match sandbox {
        SandboxMode::ReadOnly => "plan",
        SandboxMode::WorkspaceWrite => "acceptEdits",
    }
}

impl BackendAdapter for ClaudeCli {
    fn id(&self) -> BackendId {
        BackendId::new(CLAUDE_BACKEND)
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
            args: self.args(request, "stream-json"),
            stdin: Some(request.prompt.clone()),
        }
    }

    fn one_shot_command(&self, request: &CallRequest) -> Option<CommandLine> {
        Some(CommandLine {
            program: self.program.clone(),
            args: self.args(request, "json"),
            stdin: Some(request.prompt.clone()),
        })
    }
}
