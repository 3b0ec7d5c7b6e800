use std::time::Duration;

use crate::model::{BackendId, Role};

/// Failures of the process transport for a single backend call.
///
/// These are always fatal to the call that produced them. Captured stderr is
/// carried along so the workflow layer can show it to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The executable could not be started (missing binary, bad cwd, ...).
    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },
    /// The process ran and exited unsuccessfully.
    #[error("process exited with code {exit_code}: {}", summarize_stderr(.stderr))]
    NonZeroExit {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    /// The process outlived its deadline and was terminated.
    #[error("process timed out after {}s", .after.as_secs())]
    Timeout { after: Duration, stderr: String },
    /// Reading or writing the process pipes failed.
    #[error("process i/o failed: {message}")]
    Io { message: String },
}

impl TransportError {
    pub fn spawn(program: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            message: err.to_string(),
        }
    }

    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }

    /// Captured stderr, when the process got far enough to produce any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            Self::Spawn { .. } | Self::Io { .. } => None,
        }
    }

    /// Exit code for [`TransportError::NonZeroExit`].
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

fn summarize_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return "<no stderr>".to_string();
    }
    match trimmed.lines().last() {
        Some(last) if trimmed.lines().count() > 1 => format!("... {last}"),
        _ => trimmed.to_string(),
    }
}

/// Top-level error type for the harness API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid harness or backend configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (empty prompt, unsupported call mode, ...).
    #[error("validation error: {0}")]
    Validation(String),
    /// Requested backend is not registered in the harness.
    #[error("backend not found: {backend}")]
    BackendNotFound { backend: BackendId },
    /// The backend process failed; see [`TransportError`].
    #[error("transport error ({backend}): {source}")]
    Transport {
        backend: BackendId,
        source: TransportError,
    },
    /// A role that cannot work without conversation memory got no session id
    /// from its first successful call.
    #[error("{role} call on {backend} succeeded but no session id was found; refusing to continue without conversation memory")]
    SessionRequired { role: Role, backend: BackendId },
}

impl HarnessError {
    pub fn transport(backend: impl Into<BackendId>, source: TransportError) -> Self {
        Self::Transport {
            backend: backend.into(),
            source,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the transport failure, if this is one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_exit_message_uses_last_stderr_line() {
        let err = TransportError::NonZeroExit {
            exit_code: 2,
            stdout: String::new(),
            stderr: "warming up\nfatal: not logged in\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "process exited with code 2: ... fatal: not logged in"
        );
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn transport_error_exposes_stderr_through_harness_error() {
        let err = HarnessError::transport(
            "codex",
            TransportError::Timeout {
                after: Duration::from_secs(3),
                stderr: "still thinking".into(),
            },
        );
        assert_eq!(
            err.as_transport().and_then(TransportError::stderr),
            Some("still thinking")
        );
        assert!(err.to_string().contains("timed out after 3s"));
    }
}
