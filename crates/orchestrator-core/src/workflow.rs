//! Plan → review → code → review driver for one generation and one review backend.

use std::fmt;
use std::sync::Arc;

use orchestrator_ai_harness::{
    BackendClient, CallHints, CallRequest, Harness, Role, SandboxMode, SummaryKind, TextSink,
};
use tracing::{debug, error, info, warn};

use crate::approval::{ApprovalGate, Decision, Proposal, Stage};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::prompts;
use crate::report::Reporter;
use crate::run::{Outcome, OutcomeStatus, RunState, WorkflowRun};
use crate::workspace::WorkspaceInspector;

/// One backend call within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Plan,
    PlanReview,
    Code,
    CodeReview,
}

impl Step {
    pub fn role(self) -> Role {
        match self {
            Self::Plan | Self::Code => Role::Generation,
            Self::PlanReview => Role::PlanReview,
            Self::CodeReview => Role::CodeReview,
        }
    }

    /// Only the code step may write to the working tree.
    pub fn sandbox(self) -> SandboxMode {
        match self {
            Self::Code => SandboxMode::WorkspaceWrite,
            Self::Plan | Self::PlanReview | Self::CodeReview => SandboxMode::ReadOnly,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::PlanReview => "plan review",
            Self::Code => "code",
            Self::CodeReview => "code review",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
struct Settings {
    stream: bool,
    max_plan_rounds: u32,
    max_code_rounds: u32,
    generation_model: Option<String>,
    review_model: Option<String>,
}

/// Review feedback carried into the next round.
struct Revision {
    review: String,
    feedback: Option<String>,
}

/// Drives the generation actor and the reviewer through bounded plan and
/// code loops with an approval gate after every review.
pub struct PairWorkflow {
    generation: BackendClient,
    review: BackendClient,
    gate: Arc<dyn ApprovalGate>,
    inspector: Arc<dyn WorkspaceInspector>,
    reporter: Box<dyn Reporter>,
    settings: Settings,
}

impl PairWorkflow {
    /// Looks up both backends in `harness` as named by `config`.
    pub fn new(
        harness: &Harness,
        config: &WorkflowConfig,
        gate: Arc<dyn ApprovalGate>,
        inspector: Arc<dyn WorkspaceInspector>,
        reporter: Box<dyn Reporter>,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        Ok(Self {
            generation: harness.client(&config.generation_backend())?,
            review: harness.client(&config.review_backend())?,
            gate,
            inspector,
            reporter,
            settings: Settings {
                stream: config.stream,
                max_plan_rounds: config.max_plan_rounds,
                max_code_rounds: config.max_code_rounds,
                generation_model: config.generation.model.clone(),
                review_model: config.review.model.clone(),
            },
        })
    }

    /// Runs the whole workflow for `task`.
    ///
    /// Transport failures and a missing generation session stop the run with
    /// an error. Abort and exhausted round limits are regular outcomes.
    pub async fn run(&mut self, task: &str) -> Result<Outcome, WorkflowError> {
        if task.trim().is_empty() {
            return Err(WorkflowError::config("task must not be empty"));
        }
        let mut run = WorkflowRun::new(task);
        info!(
            run_id = %run.id(),
            generation = %self.generation.id(),
            review = %self.review.id(),
            "workflow started"
        );
        let result = self.drive(&mut run).await;
        match &result {
            Ok(outcome) => info!(
                run_id = %run.id(),
                status = ?outcome.status,
                plan_rounds = outcome.plan_rounds,
                code_rounds = outcome.code_rounds,
                "workflow finished"
            ),
            Err(err) => error!(run_id = %run.id(), error = %err, "workflow failed"),
        }
        result
    }

    async fn drive(&mut self, run: &mut WorkflowRun) -> Result<Outcome, WorkflowError> {
        let task = run.task().to_string();

        let mut plan = String::new();
        let mut revision: Option<Revision> = None;
        let mut approved = false;
        for round in 1..=self.settings.max_plan_rounds {
            run.enter(Stage::Plan, round);
            let prompt = match revision.take() {
                None => prompts::plan(&task),
                Some(r) => prompts::plan_revision(&r.review, r.feedback.as_deref()),
            };
            plan = self.call(run, Step::Plan, round, prompt).await?;
            let review = self
                .call(run, Step::PlanReview, round, prompts::plan_review(&task, &plan, round))
                .await?;
            run.ledger_mut().push(SummaryKind::Plan, round, plan.as_str());
            run.ledger_mut().push(SummaryKind::PlanReview, round, review.as_str());

            let proposal = Proposal {
                stage: Stage::Plan,
                round,
                max_rounds: self.settings.max_plan_rounds,
                content: &plan,
                review: &review,
            };
            match self.gate.decide(&proposal).await? {
                Decision::Approve => {
                    approved = true;
                    break;
                }
                Decision::Abort => {
                    return Ok(finish(run, OutcomeStatus::Aborted { stage: Stage::Plan }, plan));
                }
                Decision::Revise(feedback) => revision = Some(Revision { review, feedback }),
            }
        }
        if !approved {
            return Ok(finish(
                run,
                OutcomeStatus::RoundsExhausted { stage: Stage::Plan },
                plan,
            ));
        }

        let mut revision: Option<Revision> = None;
        for round in 1..=self.settings.max_code_rounds {
            run.enter(Stage::Code, round);
            let prompt = match revision.take() {
                None => prompts::implement(&plan),
                Some(r) => prompts::code_fix(&r.review, r.feedback.as_deref()),
            };
            let summary = self.call(run, Step::Code, round, prompt).await?;

            let snapshot = self.inspector.snapshot().await?;
            if snapshot.is_clean() {
                warn!(run_id = %run.id(), round, "generation left the working tree unchanged");
                self.reporter
                    .notice("the working tree has no uncommitted changes after the code step");
            }
            let review = self
                .call(
                    run,
                    Step::CodeReview,
                    round,
                    prompts::code_review(&task, &plan, &snapshot, round),
                )
                .await?;
            run.ledger_mut().push(SummaryKind::Diff, round, snapshot.render());
            run.ledger_mut().push(SummaryKind::CodeReview, round, review.as_str());

            let proposal = Proposal {
                stage: Stage::Code,
                round,
                max_rounds: self.settings.max_code_rounds,
                content: &summary,
                review: &review,
            };
            match self.gate.decide(&proposal).await? {
                Decision::Approve => return Ok(finish(run, OutcomeStatus::Approved, plan)),
                Decision::Abort => {
                    return Ok(finish(run, OutcomeStatus::Aborted { stage: Stage::Code }, plan));
                }
                Decision::Revise(feedback) => revision = Some(Revision { review, feedback }),
            }
        }
        Ok(finish(
            run,
            OutcomeStatus::RoundsExhausted { stage: Stage::Code },
            plan,
        ))
    }

    /// One backend call: session planning, the call itself, session update,
    /// and presentation. Returns the extracted response, empty on a miss.
    async fn call(
        &mut self,
        run: &mut WorkflowRun,
        step: Step,
        round: u32,
        prompt: String,
    ) -> Result<String, WorkflowError> {
        let role = step.role();
        let planned = run.sessions().prepare(role, &prompt, run.ledger());
        let (client, model) = match role {
            Role::Generation => (&self.generation, &self.settings.generation_model),
            Role::PlanReview | Role::CodeReview => (&self.review, &self.settings.review_model),
        };
        debug!(
            run_id = %run.id(),
            %step,
            round,
            backend = %client.id(),
            resume = planned.resume_session_id.is_some(),
            fallback_context = planned.used_fallback_context,
            "calling backend"
        );
        if planned.used_fallback_context {
            self.reporter.notice(&format!(
                "{step}: {} session unavailable; sending summarized context instead",
                client.id()
            ));
        }
        let request = CallRequest {
            prompt: planned.prompt,
            resume_session_id: planned.resume_session_id,
            hints: CallHints::new(role, step.sandbox()).maybe_model(model.clone()),
        };

        self.reporter.step_started(step, round);
        let result = if self.settings.stream {
            let sink: &mut dyn TextSink = &mut *self.reporter;
            client.run(request, Some(sink)).await?
        } else {
            client.run(request, None).await?
        };
        run.sessions_mut().record(role, &client.id(), &result)?;

        if !result.extraction_succeeded {
            warn!(
                run_id = %run.id(),
                %step,
                backend = %client.id(),
                "no assistant text found in backend output; showing raw stdout"
            );
        }
        self.reporter.step_finished(
            step,
            result.display_text(),
            self.settings.stream && result.extraction_succeeded,
        );
        // Raw stdout is for display only; prompts and the ledger get extracted text.
        Ok(result.response_text)
    }
}

fn finish(run: &mut WorkflowRun, status: OutcomeStatus, plan: String) -> Outcome {
    run.set_state(match &status {
        OutcomeStatus::Approved => RunState::Completed,
        OutcomeStatus::Aborted { stage } => RunState::Aborted(*stage),
        OutcomeStatus::RoundsExhausted { stage } => RunState::Exhausted(*stage),
    });
    Outcome::from_run(run, status, plan)
}
