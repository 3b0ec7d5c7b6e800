use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::backend::BackendAdapter;
use crate::call::BackendClient;
use crate::errors::HarnessError;
use crate::model::{BackendId, CallOptions};
use crate::probe::{BackendCapability, probe};
use crate::runner::{ProcessRunner, TokioProcessRunner};

struct Registered {
    adapter: Arc<dyn BackendAdapter>,
    options: CallOptions,
}

struct HarnessInner {
    backends: HashMap<BackendId, Registered>,
    order: Vec<BackendId>,
    runner: Arc<dyn ProcessRunner>,
}

/// Registry of backends sharing one process runner.
#[derive(Clone)]
pub struct Harness {
    inner: Arc<HarnessInner>,
}

impl Harness {
    /// Starts a builder for registering backends and creating a `Harness`.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Call client for a registered backend.
    pub fn client(&self, backend: &BackendId) -> Result<BackendClient, HarnessError> {
        let registered =
            self.inner
                .backends
                .get(backend)
                .ok_or_else(|| HarnessError::BackendNotFound {
                    backend: backend.clone(),
                })?;
        Ok(BackendClient::new(
            registered.adapter.clone(),
            self.inner.runner.clone(),
            registered.options.clone(),
        ))
    }

    /// Registered backend ids in registration order.
    pub fn backends(&self) -> &[BackendId] {
        &self.inner.order
    }

    /// Probes every registered backend, in registration order.
    pub async fn probe_all(&self) -> Vec<BackendCapability> {
        let mut capabilities = Vec::with_capacity(self.inner.order.len());
        for id in &self.inner.order {
            if let Some(registered) = self.inner.backends.get(id) {
                capabilities.push(probe(self.inner.runner.as_ref(), registered.adapter.as_ref()).await);
            }
        }
        capabilities
    }
}

/// Builder used to register backend adapters before creating a `Harness`.
#[derive(Default)]
pub struct HarnessBuilder {
    backends: Vec<Registered>,
    runner: Option<Arc<dyn ProcessRunner>>,
}

impl HarnessBuilder {
    /// Registers a backend adapter with default call options.
    pub fn register_backend(self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.register_backend_with_options(adapter, CallOptions::default())
    }

    /// Registers a backend adapter with its own timeout and working directory.
    pub fn register_backend_with_options(
        mut self,
        adapter: Arc<dyn BackendAdapter>,
        options: CallOptions,
    ) -> Self {
        self.backends.push(Registered { adapter, options });
        self
    }

    /// Replaces the process runner (defaults to [`TokioProcessRunner`]).
    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Builds the harness and validates backend registration (including duplicates).
    pub fn build(self) -> Result<Harness, HarnessError> {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        let mut seen: HashSet<BackendId> = HashSet::new();
        for registered in self.backends {
            let id = registered.adapter.id();
            if !seen.insert(id.clone()) {
                return Err(HarnessError::Config(format!(
                    "duplicate backend registration: {id}"
                )));
            }
            if registered.options.timeout.is_zero() {
                return Err(HarnessError::Config(format!(
                    "backend {id}: timeout must be greater than zero"
                )));
            }
            order.push(id.clone());
            map.insert(id, registered);
        }
        Ok(Harness {
            inner: Arc::new(HarnessInner {
                backends: map,
                order,
                runner: self
                    .runner
                    .unwrap_or_else(|| Arc::new(TokioProcessRunner)),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendors::claude::ClaudeCli;
    use crate::vendors::codex::CodexCli;
    use std::time::Duration;

    #[test]
    fn build_rejects_duplicate_backend_ids() {
        let result = Harness::builder()
            .register_backend(Arc::new(ClaudeCli::new()))
            .register_backend(Arc::new(ClaudeCli::with_program("/usr/local/bin/claude")))
            .build();
        assert!(
            matches!(result, Err(HarnessError::Config(message)) if message.contains("duplicate backend"))
        );
    }

    #[test]
    fn build_rejects_zero_timeout() {
        let options = CallOptions {
            timeout: Duration::ZERO,
            ..CallOptions::default()
        };
        let result = Harness::builder()
            .register_backend_with_options(Arc::new(CodexCli::new()), options)
            .build();
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn client_lookup_uses_registered_options() {
        let options = CallOptions {
            timeout: Duration::from_secs(30),
            ..CallOptions::default()
        };
        let harness = Harness::builder()
            .register_backend(Arc::new(ClaudeCli::new()))
            .register_backend_with_options(Arc::new(CodexCli::new()), options)
            .build()
            .expect("harness");

        let client = harness.client(&BackendId::new("codex")).expect("codex");
        assert_eq!(client.options().timeout, Duration::from_secs(30));
        assert_eq!(
            harness.backends(),
            &[BackendId::new("claude"), BackendId::new("codex")]
        );
        assert!(matches!(
            harness.client(&BackendId::new("gemini")),
            Err(HarnessError::BackendNotFound { .. })
        ));
    }
}
