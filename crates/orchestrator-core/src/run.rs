use orchestrator_ai_harness::{PriorSummaries, Role, SessionContinuity, SessionSlot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::approval::Stage;

/// Run state for a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Created,
    Running { stage: Stage, round: u32 },
    Completed,
    Aborted(Stage),
    Exhausted(Stage),
}

/// A single workflow run: id, task, state, and the per-run mutable state
/// (session slots and the ledger of prior summaries).
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    id: Uuid,
    task: String,
    state: RunState,
    plan_rounds: u32,
    code_rounds: u32,
    sessions: SessionContinuity,
    ledger: PriorSummaries,
}

impl WorkflowRun {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task: task.into(),
            state: RunState::Created,
            plan_rounds: 0,
            code_rounds: 0,
            sessions: SessionContinuity::new(),
            ledger: PriorSummaries::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn set_state(&mut self, state: RunState) {
        self.state = state;
    }

    /// Marks the start of `round` of `stage` and counts it.
    pub fn enter(&mut self, stage: Stage, round: u32) {
        match stage {
            Stage::Plan => self.plan_rounds = round,
            Stage::Code => self.code_rounds = round,
        }
        self.state = RunState::Running { stage, round };
    }

    pub fn plan_rounds(&self) -> u32 {
        self.plan_rounds
    }

    pub fn code_rounds(&self) -> u32 {
        self.code_rounds
    }

    pub fn sessions(&self) -> &SessionContinuity {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionContinuity {
        &mut self.sessions
    }

    /// Summaries of finished rounds, used for fallback context.
    pub fn ledger(&self) -> &PriorSummaries {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut PriorSummaries {
        &mut self.ledger
    }
}

/// How a run ended, when it ended without an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The code stage was approved.
    Approved,
    Aborted { stage: Stage },
    /// The round limit of `stage` was reached without approval.
    RoundsExhausted { stage: Stage },
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub run_id: Uuid,
    pub status: OutcomeStatus,
    pub plan_rounds: u32,
    pub code_rounds: u32,
    /// Last plan produced by the generation actor.
    pub plan: String,
    /// Final session slot of every role.
    pub sessions: Vec<(Role, SessionSlot)>,
}

impl Outcome {
    pub(crate) fn from_run(run: &WorkflowRun, status: OutcomeStatus, plan: String) -> Self {
        Self {
            run_id: run.id(),
            status,
            plan_rounds: run.plan_rounds(),
            code_rounds: run.code_rounds(),
            plan,
            sessions: [Role::Generation, Role::PlanReview, Role::CodeReview]
                .into_iter()
                .map(|role| (role, run.sessions().slot(role)))
                .collect(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == OutcomeStatus::Approved
    }

    pub fn session(&self, role: Role) -> Option<&SessionSlot> {
        self.sessions
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, slot)| slot)
    }
}
