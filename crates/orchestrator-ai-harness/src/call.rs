use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{BackendAdapter, CallRequest, CommandLine};
use crate::delta::{DeltaEmitter, TextSink};
use crate::dialect::LiveText;
use crate::errors::{HarnessError, TransportError};
use crate::event::Event;
use crate::line_buffer::{LineBuffer, decode_all};
use crate::model::{BackendId, CallOptions};
use crate::oneshot::{one_shot_session_id, parse_one_shot};
use crate::runner::{OutputObserver, PassThrough, ProcessOutput, ProcessRunner, ProcessSpec};

/// Finalized outcome of one successful backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendCallResult {
    pub raw: ProcessOutput,
    pub response_text: String,
    pub session_id: Option<String>,
    /// At least some assistant text was recovered from the output.
    pub extraction_succeeded: bool,
}

impl BackendCallResult {
    pub fn exit_code(&self) -> i32 {
        self.raw.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.raw.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.raw.stderr
    }

    /// Text to show a human: the response, or raw stdout when extraction missed.
    pub fn display_text(&self) -> &str {
        if self.extraction_succeeded {
            &self.response_text
        } else {
            &self.raw.stdout
        }
    }
}

/// Runs calls against one backend: builds the command line, drives the
/// process runner, optionally streams live deltas, and reduces the event
/// stream into a [`BackendCallResult`].
#[derive(Clone)]
pub struct BackendClient {
    adapter: Arc<dyn BackendAdapter>,
    runner: Arc<dyn ProcessRunner>,
    options: CallOptions,
}

impl BackendClient {
    pub fn new(
        adapter: Arc<dyn BackendAdapter>,
        runner: Arc<dyn ProcessRunner>,
        options: CallOptions,
    ) -> Self {
        Self {
            adapter,
            runner,
            options,
        }
    }

    pub fn id(&self) -> BackendId {
        self.adapter.id()
    }

    pub fn adapter(&self) -> &Arc<dyn BackendAdapter> {
        &self.adapter
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    /// Executes a streaming call.
    ///
    /// With a sink, assistant text is pushed to it as deltas while the process
    /// runs. The returned text always comes from reducing the complete event
    /// list after exit, never from the live state. A non-zero exit code is a
    /// [`TransportError::NonZeroExit`] even if some events were decoded.
    pub async fn run(
        &self,
        request: CallRequest,
        sink: Option<&mut dyn TextSink>,
    ) -> Result<BackendCallResult, HarnessError> {
        validate(&request)?;
        let backend = self.adapter.id();
        let dialect = self.adapter.dialect();
        let call_id = uuid::Uuid::new_v4();
        debug!(
            %call_id,
            %backend,
            role = %request.hints.role,
            resume = request.resume_session_id.is_some(),
            streaming = sink.is_some(),
            dialect = dialect.name(),
            "starting backend call"
        );

        let spec = self.spec(self.adapter.command(&request));
        let (output, events) = match sink {
            Some(sink) => {
                let mut observer = LiveObserver::new(LiveText::new(dialect), sink);
                let output = self
                    .runner
                    .run(spec, &mut observer)
                    .await
                    .map_err(|e| HarnessError::transport(backend.clone(), e))?;
                (output, observer.finish())
            }
            None => {
                let output = self
                    .runner
                    .run(spec, &mut PassThrough)
                    .await
                    .map_err(|e| HarnessError::transport(backend.clone(), e))?;
                let events = decode_all(&output.stdout);
                (output, events)
            }
        };
        let output = check_exit(&backend, output)?;

        let reduction = dialect.reduce(&events);
        if let Some(divergence) = &reduction.divergence {
            warn!(
                %call_id,
                %backend,
                terminal_len = divergence.terminal.len(),
                accumulated_len = divergence.accumulated.len(),
                "terminal result differs from accumulated assistant text; using terminal result"
            );
        }
        debug!(
            %call_id,
            %backend,
            events = events.len(),
            extracted = reduction.extraction_succeeded,
            session = reduction.session_id.is_some(),
            "backend call finished"
        );

        Ok(BackendCallResult {
            raw: output,
            response_text: reduction.response_text,
            session_id: reduction.session_id,
            extraction_succeeded: reduction.extraction_succeeded,
        })
    }

    /// Executes a non-streamed call whose stdout is a single document.
    pub async fn run_one_shot(
        &self,
        request: CallRequest,
    ) -> Result<BackendCallResult, HarnessError> {
        validate(&request)?;
        let backend = self.adapter.id();
        let command = self.adapter.one_shot_command(&request).ok_or_else(|| {
            HarnessError::validation(format!("{backend} does not support one-shot calls"))
        })?;
        debug!(%backend, role = %request.hints.role, "starting one-shot backend call");
        let output = self
            .runner
            .run(self.spec(command), &mut PassThrough)
            .await
            .map_err(|e| HarnessError::transport(backend.clone(), e))?;
        let output = check_exit(&backend, output)?;
        let response_text = parse_one_shot(&output.stdout);
        let session_id = one_shot_session_id(&output.stdout);
        Ok(BackendCallResult {
            extraction_succeeded: !response_text.trim().is_empty(),
            raw: output,
            response_text,
            session_id,
        })
    }

    fn spec(&self, command: CommandLine) -> ProcessSpec {
        ProcessSpec {
            program: command.program,
            args: command.args,
            cwd: self.options.working_dir.clone(),
            stdin: command.stdin,
            timeout: self.options.timeout,
            kill_grace: self.options.kill_grace,
        }
    }
}

fn validate(request: &CallRequest) -> Result<(), HarnessError> {
    if request.prompt.trim().is_empty() {
        return Err(HarnessError::validation("prompt must not be empty"));
    }
    if request
        .resume_session_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        return Err(HarnessError::validation("resume session id must not be blank"));
    }
    Ok(())
}

fn check_exit(backend: &BackendId, output: ProcessOutput) -> Result<ProcessOutput, HarnessError> {
    if output.exit_code == 0 {
        return Ok(output);
    }
    Err(HarnessError::transport(
        backend.clone(),
        TransportError::NonZeroExit {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        },
    ))
}

/// Stdout observer for streaming calls: line buffer, extractor, unit keying
/// and delta emission on the hot path, plus the full event log for the reducer.
struct LiveObserver<'d, 's> {
    buffer: LineBuffer,
    live: LiveText<'d>,
    emitter: DeltaEmitter,
    sink: &'s mut dyn TextSink,
    events: Vec<Event>,
}

impl<'d, 's> LiveObserver<'d, 's> {
    fn new(live: LiveText<'d>, sink: &'s mut dyn TextSink) -> Self {
        Self {
            buffer: LineBuffer::new(),
            live,
            emitter: DeltaEmitter::new(),
            sink,
            events: Vec::new(),
        }
    }

    fn push(&mut self, event: Event) {
        if let Some(update) = self.live.observe(&event) {
            self.emitter
                .update_into(&update.unit_id, &update.text, &mut *self.sink);
        }
        self.events.push(event);
    }

    fn finish(mut self) -> Vec<Event> {
        for event in self.buffer.flush() {
            self.push(event);
        }
        self.events
    }
}

impl OutputObserver for LiveObserver<'_, '_> {
    fn on_stdout(&mut self, chunk: &[u8]) {
        for event in self.buffer.feed_bytes(chunk) {
            self.push(event);
        }
    }
}
