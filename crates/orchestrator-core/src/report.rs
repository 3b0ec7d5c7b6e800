use orchestrator_ai_harness::TextSink;

use crate::workflow::Step;

/// Presentation seam for a run. Live deltas arrive through [`TextSink`]
/// between `step_started` and `step_finished` when streaming is enabled.
pub trait Reporter: TextSink {
    fn step_started(&mut self, step: Step, round: u32);

    /// `streamed` tells whether `text` was already shown as live deltas.
    fn step_finished(&mut self, step: Step, text: &str, streamed: bool);

    /// Out-of-band message for the user (empty diff, fallback context, ...).
    fn notice(&mut self, _message: &str) {}
}
