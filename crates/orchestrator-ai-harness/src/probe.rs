use std::time::Duration;

use crate::backend::BackendAdapter;
use crate::model::BackendId;
use crate::runner::{PassThrough, ProcessRunner, ProcessSpec};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_KILL_GRACE: Duration = Duration::from_secs(1);

/// Result of checking whether a backend binary can be launched.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BackendCapability {
    pub backend: BackendId,
    pub program: String,
    pub available: bool,
    /// First non-empty line the binary printed for its version flag.
    pub version: Option<String>,
    /// Why the backend is unavailable.
    pub detail: Option<String>,
}

/// Runs the adapter's version command. Never fails: a binary that cannot be
/// started or exits non-zero is reported as unavailable.
pub async fn probe(runner: &dyn ProcessRunner, adapter: &dyn BackendAdapter) -> BackendCapability {
    let spec = ProcessSpec {
        program: adapter.program().to_string(),
        args: adapter.version_args(),
        cwd: None,
        stdin: None,
        timeout: PROBE_TIMEOUT,
        kill_grace: PROBE_KILL_GRACE,
    };
    let mut capability = BackendCapability {
        backend: adapter.id(),
        program: adapter.program().to_string(),
        available: false,
        version: None,
        detail: None,
    };
    match runner.run(spec, &mut PassThrough).await {
        Ok(output) if output.exit_code == 0 => {
            capability.available = true;
            capability.version = first_line(&output.stdout).or_else(|| first_line(&output.stderr));
        }
        Ok(output) => {
            capability.detail = Some(format!("`--version` exited with code {}", output.exit_code));
        }
        Err(err) => capability.detail = Some(err.to_string()),
    }
    tracing::debug!(
        backend = %capability.backend,
        available = capability.available,
        version = capability.version.as_deref().unwrap_or("-"),
        "probed backend"
    );
    capability
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}
