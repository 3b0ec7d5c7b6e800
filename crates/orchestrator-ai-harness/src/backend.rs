use crate::dialect::Dialect;
use crate::model::{BackendId, CallHints};

/// One call as seen by an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    pub prompt: String,
    /// `None` starts a new conversation; the resume directive is omitted.
    pub resume_session_id: Option<String>,
    pub hints: CallHints,
}

/// Concrete invocation produced by an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

/// Contract implemented by each CLI assistant integration.
///
/// Adapters are pure: they turn a [`CallRequest`] into a command line and
/// expose the [`Dialect`] that understands the process output.
pub trait BackendAdapter: Send + Sync {
    /// Stable backend id (for example `claude`).
    fn id(&self) -> BackendId;

    /// Executable that will be launched.
    fn program(&self) -> &str;

    /// Event grammar of the streamed output.
    fn dialect(&self) -> &dyn Dialect;

    /// Streaming invocation for `request`.
    fn command(&self, request: &CallRequest) -> CommandLine;

    /// Single-document invocation, when the backend has one.
    fn one_shot_command(&self, _request: &CallRequest) -> Option<CommandLine> {
        None
    }

    /// Arguments used by the capability probe.
    fn version_args(&self) -> Vec<String> {
        vec!["--version".to_string()]
    }
}
