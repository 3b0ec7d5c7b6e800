use std::collections::HashMap;
use std::fmt;

use crate::call::BackendCallResult;
use crate::errors::HarnessError;
use crate::model::{BackendId, Continuity, Role};

/// Longest summary text carried into a fallback context block, in characters.
const SUMMARY_LIMIT: usize = 4000;

/// Conversation state of one workflow role.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionSlot {
    /// No call has produced a session id yet.
    #[default]
    Unset,
    /// Set once from the first call that reported an id; never changes after.
    Fixed(String),
    /// Extraction failed for a best-effort role; calls carry synthesized context.
    Fallback,
}

/// What a prior summary describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SummaryKind {
    Plan,
    PlanReview,
    Diff,
    CodeReview,
}

impl SummaryKind {
    fn title(self) -> &'static str {
        match self {
            Self::Plan => "Plan",
            Self::PlanReview => "Plan review",
            Self::Diff => "Diff",
            Self::CodeReview => "Code review",
        }
    }

    /// Kinds that make up the fallback context of `role`.
    fn relevant_to(self, role: Role) -> bool {
        match role {
            Role::PlanReview => matches!(self, Self::Plan | Self::PlanReview),
            Role::CodeReview => matches!(self, Self::Diff | Self::CodeReview),
            Role::Generation => true,
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryEntry {
    pub kind: SummaryKind,
    pub round: u32,
    pub text: String,
}

/// Ordered record of what happened so far in a run, owned by the workflow
/// driver and read here only to build fallback context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriorSummaries {
    entries: Vec<SummaryEntry>,
}

impl PriorSummaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a summary; blank text is ignored.
    pub fn push(&mut self, kind: SummaryKind, round: u32, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.entries.push(SummaryEntry { kind, round, text });
    }

    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// "What happened so far" block for `role`, or `None` when nothing applies.
    pub fn context_block(&self, role: Role) -> Option<String> {
        let sections: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.kind.relevant_to(role))
            .map(|entry| {
                format!(
                    "## {} (round {})\n{}",
                    entry.kind,
                    entry.round,
                    truncate(entry.text.trim(), SUMMARY_LIMIT)
                )
            })
            .collect();
        if sections.is_empty() {
            return None;
        }
        Some(format!(
            "Context from earlier rounds (the previous conversation could not be resumed):\n\n{}",
            sections.join("\n\n")
        ))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}\n[truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Call parameters decided by [`SessionContinuity::prepare`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedCall {
    pub prompt: String,
    pub resume_session_id: Option<String>,
    pub used_fallback_context: bool,
}

/// Per-role session slots for one workflow run.
///
/// Single writer: the workflow driver calls [`prepare`](Self::prepare) before
/// and [`record`](Self::record) after every backend call, strictly in order.
#[derive(Clone, Debug, Default)]
pub struct SessionContinuity {
    slots: HashMap<Role, SessionSlot>,
}

impl SessionContinuity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, role: Role) -> SessionSlot {
        self.slots.get(&role).cloned().unwrap_or_default()
    }

    /// Fixed session id of `role`, if any.
    pub fn session_id(&self, role: Role) -> Option<&str> {
        match self.slots.get(&role) {
            Some(SessionSlot::Fixed(id)) => Some(id),
            _ => None,
        }
    }

    /// Decides whether the next call of `role` resumes, starts fresh, or
    /// carries a synthesized context block.
    pub fn prepare(&self, role: Role, prompt: &str, summaries: &PriorSummaries) -> PlannedCall {
        match self.slots.get(&role) {
            Some(SessionSlot::Fixed(id)) => PlannedCall {
                prompt: prompt.to_string(),
                resume_session_id: Some(id.clone()),
                used_fallback_context: false,
            },
            Some(SessionSlot::Fallback) => match summaries.context_block(role) {
                Some(block) => PlannedCall {
                    prompt: format!("{block}\n\n---\n\n{prompt}"),
                    resume_session_id: None,
                    used_fallback_context: true,
                },
                None => fresh(prompt),
            },
            Some(SessionSlot::Unset) | None => fresh(prompt),
        }
    }

    /// Updates the slot of `role` from a successful call.
    ///
    /// Only an unset slot changes. A role that requires continuity and got
    /// no session id yields [`HarnessError::SessionRequired`].
    pub fn record(
        &mut self,
        role: Role,
        backend: &BackendId,
        result: &BackendCallResult,
    ) -> Result<(), HarnessError> {
        let slot = self.slots.entry(role).or_default();
        if *slot != SessionSlot::Unset {
            return Ok(());
        }
        match result.session_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                tracing::debug!(%role, %backend, session_id = id, "session fixed");
                *slot = SessionSlot::Fixed(id.to_string());
                Ok(())
            }
            None => match role.continuity() {
                Continuity::Required => Err(HarnessError::SessionRequired {
                    role,
                    backend: backend.clone(),
                }),
                Continuity::BestEffort => {
                    tracing::warn!(
                        %role,
                        %backend,
                        "no session id in backend output; later calls will carry summary context instead of resuming"
                    );
                    *slot = SessionSlot::Fallback;
                    Ok(())
                }
            },
        }
    }
}

fn fresh(prompt: &str) -> PlannedCall {
    PlannedCall {
        prompt: prompt.to_string(),
        resume_session_id: None,
        used_fallback_context: false,
    }
}
