use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilitySettings {
    pub enabled: bool,
    /// Filter directive (`info`, `orchestrator_ai_harness=debug`, ...).
    pub filter: String,
    /// JSONL log file; `None` logs to stderr.
    pub json_log_path: Option<PathBuf>,
}

impl ObservabilitySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = [
            "ORCHESTRATOR_OBSERVABILITY_ENABLED",
            "ORCHESTRATOR_OBSERVABILITY",
        ]
        .into_iter()
        .find_map(|key| lookup(key))
        .map(|value| parse_bool(&value).unwrap_or(true))
        .unwrap_or(true);
        let filter = ["ORCHESTRATOR_LOG_LEVEL", "RUST_LOG"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .find(|value| tracing_subscriber::EnvFilter::try_new(value).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let json_log_path = lookup("ORCHESTRATOR_JSON_LOG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self {
            enabled,
            filter,
            json_log_path,
        }
    }
}

/// Initialize observability logging once per process.
///
/// Environment variables:
/// - `ORCHESTRATOR_OBSERVABILITY_ENABLED` / `ORCHESTRATOR_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `ORCHESTRATOR_LOG_LEVEL`, then `RUST_LOG`: optional filter (default `warn`).
/// - `ORCHESTRATOR_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact format; stdout is reserved for assistant output.
pub fn init_observability() {
    init_observability_with(ObservabilitySettings::from_env());
}

/// Same as [`init_observability`] with explicit settings. Only the first call
/// in a process has any effect.
pub fn init_observability_with(settings: ObservabilitySettings) {
    INIT.get_or_init(|| {
        if !settings.enabled {
            return;
        }
        let env_filter = tracing_subscriber::EnvFilter::try_new(&settings.filter)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

        if let Some(path) = settings.json_log_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                let _ = std::fs::create_dir_all(parent);
            }
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("orchestrator.logs.jsonl")
                .to_string();
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    });
}
