use std::fmt;
use std::time::Duration;

/// Stable identifier for a backend implementation (for example `claude`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BackendId(pub String);

impl BackendId {
    /// Creates a backend id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the backend id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Known CLI assistant families.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `claude -p --output-format stream-json`.
    Claude,
    /// `codex exec --json`.
    Codex,
}

impl BackendKind {
    /// Default executable name looked up on `PATH`.
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_program())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            other => Err(format!("unknown backend kind `{other}` (expected claude or codex)")),
        }
    }
}

/// Workflow role a call is made on behalf of. Each role owns its own session slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The single actor that writes plans and code.
    Generation,
    /// Reviewer of plans.
    PlanReview,
    /// Reviewer of diffs.
    CodeReview,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::PlanReview => "plan_review",
            Self::CodeReview => "code_review",
        }
    }

    /// Whether losing the conversation for this role must stop the workflow.
    pub fn continuity(self) -> Continuity {
        match self {
            Self::Generation => Continuity::Required,
            Self::PlanReview | Self::CodeReview => Continuity::BestEffort,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly a role depends on resuming its backend conversation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Continuity {
    /// A missing session id on the first call is fatal.
    Required,
    /// A missing session id switches the role to synthesized context.
    BestEffort,
}

/// Filesystem access granted to the backend for one call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// Analysis only; the backend must not edit the workspace.
    #[default]
    ReadOnly,
    /// The backend may edit files inside the working directory.
    WorkspaceWrite,
}

/// Per-call hints used by adapters to build backend arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallHints {
    pub role: Role,
    pub sandbox: SandboxMode,
    /// Backend-specific model name. `None` leaves the backend default.
    pub model: Option<String>,
}

impl CallHints {
    pub fn new(role: Role, sandbox: SandboxMode) -> Self {
        Self {
            role,
            sandbox,
            model: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn maybe_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.trim().is_empty());
        self
    }
}

/// Process-level limits applied to every call made through a client.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CallOptions {
    /// Wall-clock limit for one backend process.
    pub timeout: Duration,
    /// Time between the graceful terminate signal and the forced kill.
    pub kill_grace: Duration,
    /// Working directory for the backend process; `None` inherits ours.
    pub working_dir: Option<std::path::PathBuf>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(900),
            kill_grace: Duration::from_secs(5),
            working_dir: None,
        }
    }
}
