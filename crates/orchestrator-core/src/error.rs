use orchestrator_ai_harness::HarnessError;
use thiserror::Error;

/// Failures that stop a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A backend call failed or a required session could not be established.
    #[error(transparent)]
    Harness(#[from] HarnessError),
    /// Invalid configuration file, environment override, or flag.
    #[error("config error: {0}")]
    Config(String),
    /// Inspecting the working tree (git) failed.
    #[error("workspace error: {0}")]
    Workspace(String),
    /// The approval gate could not obtain a decision.
    #[error("approval error: {0}")]
    Approval(String),
}

impl WorkflowError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace(message.into())
    }

    pub fn approval(message: impl Into<String>) -> Self {
        Self::Approval(message.into())
    }

    /// Stderr captured from a failed backend process, if any.
    pub fn backend_stderr(&self) -> Option<&str> {
        match self {
            Self::Harness(err) => err.as_transport()?.stderr(),
            _ => None,
        }
    }
}
