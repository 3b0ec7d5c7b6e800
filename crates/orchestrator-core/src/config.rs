//! Workflow configuration: TOML file, then `ORCHESTRATOR_*` environment
//! overrides, then command-line flags applied by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use orchestrator_ai_harness::vendors::adapter_for;
use orchestrator_ai_harness::{BackendId, BackendKind, CallOptions, Harness, HarnessBuilder};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

const fn default_timeout_secs() -> u64 {
    900
}

const fn default_kill_grace_secs() -> u64 {
    5
}

const fn default_rounds() -> u32 {
    3
}

const fn default_stream() -> bool {
    true
}

/// One backend section (`[generation]` or `[review]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend family; each section has its own default.
    #[serde(default)]
    pub kind: Option<BackendKind>,
    /// Executable path; defaults to the family's binary on `PATH`.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_kill_grace_secs")]
    pub kill_grace_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: None,
            program: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            kill_grace_secs: default_kill_grace_secs(),
        }
    }
}

impl BackendConfig {
    fn resolved_kind(&self, fallback: BackendKind) -> BackendKind {
        self.kind.unwrap_or(fallback)
    }

    fn call_options(&self, working_dir: Option<PathBuf>) -> CallOptions {
        CallOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            kill_grace: Duration::from_secs(self.kill_grace_secs),
            working_dir,
        }
    }
}

/// Settings for one plan/review/code/review run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Actor that writes plans and code. Defaults to Claude.
    #[serde(default)]
    pub generation: BackendConfig,
    /// Actor that reviews plans and diffs. Defaults to Codex.
    #[serde(default)]
    pub review: BackendConfig,
    /// Print assistant text live as it arrives.
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default = "default_rounds")]
    pub max_plan_rounds: u32,
    #[serde(default = "default_rounds")]
    pub max_code_rounds: u32,
    /// Repository both backends work in; `None` uses the current directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            generation: BackendConfig::default(),
            review: BackendConfig::default(),
            stream: default_stream(),
            max_plan_rounds: default_rounds(),
            max_code_rounds: default_rounds(),
            working_dir: None,
        }
    }
}

impl WorkflowConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, WorkflowError> {
        toml::from_str(source).map_err(|e| WorkflowError::config(format!("invalid config: {e}")))
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: &Path) -> Result<Self, WorkflowError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Applies `ORCHESTRATOR_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), WorkflowError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), WorkflowError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("ORCHESTRATOR_GENERATION_MODEL") {
            self.generation.model = Some(model);
        }
        if let Some(model) = get("ORCHESTRATOR_REVIEW_MODEL") {
            self.review.model = Some(model);
        }
        if let Some(raw) = get("ORCHESTRATOR_STREAM") {
            self.stream = parse_bool(&raw).ok_or_else(|| {
                WorkflowError::config(format!("ORCHESTRATOR_STREAM: expected a boolean, got `{raw}`"))
            })?;
        }
        if let Some(raw) = get("ORCHESTRATOR_MAX_PLAN_ROUNDS") {
            self.max_plan_rounds = parse_rounds("ORCHESTRATOR_MAX_PLAN_ROUNDS", &raw)?;
        }
        if let Some(raw) = get("ORCHESTRATOR_MAX_CODE_ROUNDS") {
            self.max_code_rounds = parse_rounds("ORCHESTRATOR_MAX_CODE_ROUNDS", &raw)?;
        }
        for (key, kind) in [
            ("ORCHESTRATOR_CLAUDE_BIN", BackendKind::Claude),
            ("ORCHESTRATOR_CODEX_BIN", BackendKind::Codex),
        ] {
            if let Some(program) = get(key) {
                if self.generation_kind() == kind {
                    self.generation.program = Some(program.clone());
                }
                if self.review_kind() == kind {
                    self.review.program = Some(program);
                }
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.max_plan_rounds == 0 {
            return Err(WorkflowError::config("max_plan_rounds must be at least 1"));
        }
        if self.max_code_rounds == 0 {
            return Err(WorkflowError::config("max_code_rounds must be at least 1"));
        }
        for (section, backend) in [("generation", &self.generation), ("review", &self.review)] {
            if backend.timeout_secs == 0 {
                return Err(WorkflowError::config(format!(
                    "[{section}] timeout_secs must be greater than zero"
                )));
            }
            if backend.program.as_deref().is_some_and(|p| p.trim().is_empty()) {
                return Err(WorkflowError::config(format!("[{section}] program must not be empty")));
            }
        }
        if self.generation_kind() == self.review_kind()
            && (self.generation.program != self.review.program
                || self.generation.timeout_secs != self.review.timeout_secs
                || self.generation.kill_grace_secs != self.review.kill_grace_secs)
        {
            return Err(WorkflowError::config(format!(
                "generation and review both use {} but configure its program or timeouts differently",
                self.generation_kind()
            )));
        }
        Ok(())
    }

    pub fn generation_kind(&self) -> BackendKind {
        self.generation.resolved_kind(BackendKind::Claude)
    }

    pub fn review_kind(&self) -> BackendKind {
        self.review.resolved_kind(BackendKind::Codex)
    }

    pub fn generation_backend(&self) -> BackendId {
        BackendId::new(self.generation_kind().to_string())
    }

    pub fn review_backend(&self) -> BackendId {
        BackendId::new(self.review_kind().to_string())
    }

    /// Validates and registers both backends. A family shared by both roles
    /// is registered once.
    pub fn harness_builder(&self) -> Result<HarnessBuilder, WorkflowError> {
        self.validate()?;
        let mut builder = Harness::builder().register_backend_with_options(
            adapter_for(self.generation_kind(), self.generation.program.as_deref()),
            self.generation.call_options(self.working_dir.clone()),
        );
        if self.review_kind() != self.generation_kind() {
            builder = builder.register_backend_with_options(
                adapter_for(self.review_kind(), self.review.program.as_deref()),
                self.review.call_options(self.working_dir.clone()),
            );
        }
        Ok(builder)
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn parse_rounds(key: &str, raw: &str) -> Result<u32, WorkflowError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| WorkflowError::config(format!("{key}: expected a round count, got `{raw}`")))
}
