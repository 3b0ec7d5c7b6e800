//! Terminal implementations of the reporter and approval seams.

use std::io::{self, Write};

use orchestrator_ai_harness::TextSink;
use orchestrator_core::{
    ApprovalGate, Decision, Proposal, Reporter, Step, WorkflowError, parse_decision,
};
use tokio::io::{AsyncBufReadExt as _, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

/// Writes `bytes` and flushes, so partial lines show up immediately.
fn write_now(out: &mut dyn Write, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}

/// Prints step banners and assistant text to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl TextSink for ConsoleReporter {
    fn receive(&mut self, chunk: &str) {
        if let Err(err) = write_now(&mut io::stdout().lock(), chunk.as_bytes()) {
            debug!(error = %err, "failed to write live output");
        }
    }
}

impl Reporter for ConsoleReporter {
    fn step_started(&mut self, step: Step, round: u32) {
        println!("\n=== {step} (round {round}) ===");
    }

    fn step_finished(&mut self, _step: Step, text: &str, streamed: bool) {
        if streamed {
            println!();
        } else {
            println!("{}", text.trim_end());
        }
    }

    fn notice(&mut self, message: &str) {
        eprintln!("note: {message}");
    }
}

/// Asks the user on stdin. End of input aborts the run.
pub struct TerminalGate {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalGate {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for TerminalGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ApprovalGate for TerminalGate {
    async fn decide(&self, proposal: &Proposal<'_>) -> Result<Decision, WorkflowError> {
        let mut lines = self.lines.lock().await;
        loop {
            let last = if proposal.is_last_round() {
                " (last round: revising ends the run)"
            } else {
                ""
            };
            let prompt = format!(
                "\n[{} round {}/{}]{last} approve (a), revise (r or type direction), quit (q): ",
                proposal.stage, proposal.round, proposal.max_rounds
            );
            if let Err(err) = write_now(&mut io::stdout().lock(), prompt.as_bytes()) {
                debug!(error = %err, "failed to write approval prompt");
            }

            let line = lines
                .next_line()
                .await
                .map_err(|e| WorkflowError::approval(format!("reading stdin failed: {e}")))?;
            let Some(line) = line else {
                return Ok(Decision::Abort);
            };
            if let Some(decision) = parse_decision(&line) {
                return Ok(decision);
            }
        }
    }
}
