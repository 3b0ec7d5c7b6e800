use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use orchestrator_ai_harness::{
    HarnessError, OutputObserver, ProcessOutput, ProcessRunner, ProcessSpec, Role, SessionSlot,
    TextSink, TransportError,
};
use orchestrator_core::{
    ApprovalGate, Decision, OutcomeStatus, PairWorkflow, Proposal, Reporter, Stage, Step,
    WorkflowConfig, WorkflowError, WorkspaceInspector, WorkspaceSnapshot,
};

#[derive(Clone)]
struct Reply {
    stdout: String,
    exit_code: i32,
    stderr: String,
}

impl Reply {
    fn ok(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: 0,
            stderr: String::new(),
        }
    }
}

/// Replays scripted replies per program; the last reply repeats once the
/// script runs out.
#[derive(Default)]
struct FakeRunner {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<ProcessSpec>>,
}

impl FakeRunner {
    fn script(self, program: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .expect("lock")
            .insert(program.to_string(), replies.into());
        self
    }

    fn calls_to(&self, program: &str) -> Vec<ProcessSpec> {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|spec| spec.program == program)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        spec: ProcessSpec,
        observer: &mut dyn OutputObserver,
    ) -> Result<ProcessOutput, TransportError> {
        let reply = {
            let mut scripts = self.scripts.lock().expect("lock");
            let queue = scripts.get_mut(&spec.program).ok_or_else(|| TransportError::Spawn {
                program: spec.program.clone(),
                message: "not scripted".into(),
            })?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
        .ok_or_else(|| TransportError::io("script exhausted"))?;
        self.calls.lock().expect("lock").push(spec);

        for chunk in reply.stdout.as_bytes().chunks(11) {
            observer.on_stdout(chunk);
        }
        Ok(ProcessOutput {
            exit_code: reply.exit_code,
            stdout: reply.stdout,
            stderr: reply.stderr,
        })
    }
}

fn claude(session: Option<&str>, text: &str) -> Reply {
    let mut lines = Vec::new();
    if let Some(id) = session {
        lines.push(serde_json::json!({"type":"system","subtype":"init","session_id":id}));
    }
    lines.push(serde_json::json!({
        "type":"assistant",
        "message":{"content":[{"type":"text","text":text}]}
    }));
    let mut result = serde_json::json!({"type":"result","subtype":"success","result":text});
    if let Some(id) = session {
        result["session_id"] = serde_json::json!(id);
    }
    lines.push(result);
    Reply::ok(jsonl(&lines))
}

fn codex(thread: Option<&str>, text: &str) -> Reply {
    let mut lines = Vec::new();
    if let Some(id) = thread {
        lines.push(serde_json::json!({"type":"thread.started","thread_id":id}));
    }
    lines.push(serde_json::json!({"type":"turn.started"}));
    lines.push(serde_json::json!({
        "type":"item.completed",
        "item":{"id":"item_0","type":"agent_message","text":text}
    }));
    lines.push(serde_json::json!({"type":"turn.completed","usage":{"input_tokens":10}}));
    Reply::ok(jsonl(&lines))
}

fn jsonl(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

#[derive(Default)]
struct ScriptedGate {
    decisions: Mutex<VecDeque<Decision>>,
    seen: Mutex<Vec<(Stage, u32, String)>>,
}

impl ScriptedGate {
    fn new(decisions: Vec<Decision>) -> Arc<Self> {
        Arc::new(Self {
            decisions: Mutex::new(decisions.into()),
            seen: Mutex::default(),
        })
    }
}

#[async_trait::async_trait]
impl ApprovalGate for ScriptedGate {
    async fn decide(&self, proposal: &Proposal<'_>) -> Result<Decision, WorkflowError> {
        self.seen.lock().expect("lock").push((
            proposal.stage,
            proposal.round,
            proposal.review.to_string(),
        ));
        self.decisions
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or_else(|| WorkflowError::approval("no scripted decision left"))
    }
}

struct FakeWorkspace;

#[async_trait::async_trait]
impl WorkspaceInspector for FakeWorkspace {
    async fn snapshot(&self) -> Result<WorkspaceSnapshot, WorkflowError> {
        Ok(WorkspaceSnapshot {
            status: " M src/parser.rs".into(),
            diff: "+pub fn parse() {}".into(),
        })
    }
}

#[derive(Clone, Default)]
struct RecordingReporter {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    fn entries(&self) -> Vec<String> {
        self.log.lock().expect("lock").clone()
    }
}

impl TextSink for RecordingReporter {
    fn receive(&mut self, chunk: &str) {
        self.log.lock().expect("lock").push(format!("delta:{chunk}"));
    }
}

impl Reporter for RecordingReporter {
    fn step_started(&mut self, step: Step, round: u32) {
        self.log.lock().expect("lock").push(format!("start:{step}:{round}"));
    }

    fn step_finished(&mut self, step: Step, text: &str, streamed: bool) {
        self.log
            .lock()
            .expect("lock")
            .push(format!("done:{step}:{streamed}:{text}"));
    }

    fn notice(&mut self, message: &str) {
        self.log.lock().expect("lock").push(format!("notice:{message}"));
    }
}

struct Fixture {
    runner: Arc<FakeRunner>,
    gate: Arc<ScriptedGate>,
    reporter: RecordingReporter,
    workflow: PairWorkflow,
}

fn fixture(config: WorkflowConfig, runner: FakeRunner, decisions: Vec<Decision>) -> Fixture {
    let runner = Arc::new(runner);
    let gate = ScriptedGate::new(decisions);
    let reporter = RecordingReporter::default();
    let harness = config
        .harness_builder()
        .expect("builder")
        .runner(runner.clone())
        .build()
        .expect("harness");
    let workflow = PairWorkflow::new(
        &harness,
        &config,
        gate.clone(),
        Arc::new(FakeWorkspace),
        Box::new(reporter.clone()),
    )
    .expect("workflow");
    Fixture {
        runner,
        gate,
        reporter,
        workflow,
    }
}

fn resume_arg(spec: &ProcessSpec, flag: &str) -> Option<String> {
    spec.args
        .windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

#[tokio::test]
async fn approved_run_reuses_generation_session_for_code() {
    let runner = FakeRunner::default()
        .script(
            "claude",
            vec![
                claude(Some("gen-1"), "1. add parser"),
                claude(Some("gen-1"), "Added parser."),
            ],
        )
        .script(
            "codex",
            vec![
                codex(Some("plan-thread"), "APPROVE"),
                codex(Some("code-thread"), "APPROVE"),
            ],
        );
    let mut f = fixture(
        WorkflowConfig::default(),
        runner,
        vec![Decision::Approve, Decision::Approve],
    );

    let outcome = f.workflow.run("add a parser").await.expect("run");

    assert_eq!(outcome.status, OutcomeStatus::Approved);
    assert_eq!((outcome.plan_rounds, outcome.code_rounds), (1, 1));
    assert_eq!(outcome.plan, "1. add parser");
    assert_eq!(
        outcome.session(Role::Generation),
        Some(&SessionSlot::Fixed("gen-1".into()))
    );
    assert_eq!(
        outcome.session(Role::CodeReview),
        Some(&SessionSlot::Fixed("code-thread".into()))
    );

    let generation = f.runner.calls_to("claude");
    assert_eq!(resume_arg(&generation[0], "--resume"), None);
    assert_eq!(resume_arg(&generation[1], "--resume").as_deref(), Some("gen-1"));
    assert_eq!(resume_arg(&generation[0], "--permission-mode").as_deref(), Some("plan"));
    assert_eq!(
        resume_arg(&generation[1], "--permission-mode").as_deref(),
        Some("acceptEdits")
    );

    // Plan review and code review are separate roles with separate sessions.
    let review = f.runner.calls_to("codex");
    assert_eq!(review.len(), 2);
    assert!(review.iter().all(|spec| resume_arg(spec, "resume").is_none()));
    assert!(
        review[1]
            .stdin
            .as_deref()
            .is_some_and(|p| p.contains("+pub fn parse() {}"))
    );
}

#[tokio::test]
async fn revised_plan_resumes_both_conversations() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "plan v1"), claude(Some("gen-1"), "plan v2")])
        .script(
            "codex",
            vec![codex(Some("t-1"), "REVISE: add tests"), codex(Some("t-1"), "APPROVE")],
        );
    let config = WorkflowConfig {
        max_code_rounds: 1,
        ..WorkflowConfig::default()
    };
    let mut f = fixture(
        config,
        runner,
        vec![
            Decision::Revise(Some("keep it small".into())),
            Decision::Approve,
            Decision::Approve,
        ],
    );

    let outcome = f.workflow.run("add a parser").await.expect("run");
    assert_eq!(outcome.status, OutcomeStatus::Approved);
    assert_eq!(outcome.plan, "plan v2");
    assert_eq!(outcome.plan_rounds, 2);

    let generation = f.runner.calls_to("claude");
    let revision_prompt = generation[1].stdin.as_deref().expect("stdin");
    assert!(revision_prompt.contains("REVISE: add tests"));
    assert!(revision_prompt.contains("keep it small"));
    assert_eq!(resume_arg(&generation[1], "--resume").as_deref(), Some("gen-1"));

    let review = f.runner.calls_to("codex");
    assert_eq!(resume_arg(&review[0], "resume"), None);
    assert_eq!(resume_arg(&review[1], "resume").as_deref(), Some("t-1"));

    let seen = f.gate.seen.lock().expect("lock").clone();
    assert_eq!(seen[0], (Stage::Plan, 1, "REVISE: add tests".to_string()));
    assert_eq!(seen[2].0, Stage::Code);
}

#[tokio::test]
async fn generation_without_session_id_stops_the_run() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(None, "a perfectly good plan")])
        .script("codex", vec![codex(Some("t-1"), "APPROVE")]);
    let mut f = fixture(WorkflowConfig::default(), runner, vec![Decision::Approve]);

    let err = f.workflow.run("add a parser").await.expect_err("must stop");
    assert!(matches!(
        err,
        WorkflowError::Harness(HarnessError::SessionRequired {
            role: Role::Generation,
            ..
        })
    ));
    assert!(f.runner.calls_to("codex").is_empty());
}

#[tokio::test]
async fn reviewer_without_session_gets_summarized_context() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "plan v1"), claude(Some("gen-1"), "plan v2")])
        .script(
            "codex",
            vec![codex(None, "REVISE: risky"), codex(None, "APPROVE")],
        );
    let config = WorkflowConfig {
        max_plan_rounds: 2,
        ..WorkflowConfig::default()
    };
    let mut f = fixture(
        config,
        runner,
        vec![Decision::Revise(None), Decision::Abort],
    );

    let outcome = f.workflow.run("add a parser").await.expect("run");
    assert_eq!(outcome.status, OutcomeStatus::Aborted { stage: Stage::Plan });
    assert_eq!(outcome.session(Role::PlanReview), Some(&SessionSlot::Fallback));

    let review = f.runner.calls_to("codex");
    assert_eq!(resume_arg(&review[1], "resume"), None);
    let second = review[1].stdin.as_deref().expect("stdin");
    assert!(second.starts_with("Context from earlier rounds"));
    assert!(second.contains("## Plan (round 1)\nplan v1"));
    assert!(second.contains("## Plan review (round 1)\nREVISE: risky"));
    assert!(second.contains("plan v2"));

    assert!(
        f.reporter
            .entries()
            .iter()
            .any(|e| e.starts_with("notice:plan review: codex session unavailable"))
    );
}

#[tokio::test]
async fn plan_rounds_run_out_without_approval() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "plan")])
        .script("codex", vec![codex(Some("t-1"), "REVISE")]);
    let config = WorkflowConfig {
        max_plan_rounds: 2,
        ..WorkflowConfig::default()
    };
    let mut f = fixture(
        config,
        runner,
        vec![Decision::Revise(None), Decision::Revise(None)],
    );

    let outcome = f.workflow.run("task").await.expect("run");
    assert_eq!(
        outcome.status,
        OutcomeStatus::RoundsExhausted { stage: Stage::Plan }
    );
    assert_eq!(outcome.plan_rounds, 2);
    assert_eq!(outcome.code_rounds, 0);
    assert_eq!(f.runner.calls_to("claude").len(), 2);
}

#[tokio::test]
async fn abort_during_code_review_is_an_outcome() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "plan")])
        .script("codex", vec![codex(Some("t-1"), "looks fine")]);
    let mut f = fixture(
        WorkflowConfig::default(),
        runner,
        vec![Decision::Approve, Decision::Abort],
    );
    let outcome = f.workflow.run("task").await.expect("run");
    assert_eq!(outcome.status, OutcomeStatus::Aborted { stage: Stage::Code });
    assert_eq!(outcome.code_rounds, 1);
}

#[tokio::test]
async fn reviewer_failure_surfaces_stderr() {
    let failing = Reply {
        stdout: String::new(),
        exit_code: 2,
        stderr: "error: not logged in".into(),
    };
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "plan")])
        .script("codex", vec![failing]);
    let mut f = fixture(WorkflowConfig::default(), runner, vec![]);

    let err = f.workflow.run("task").await.expect_err("transport");
    assert_eq!(err.backend_stderr(), Some("error: not logged in"));
    assert!(err.to_string().contains("codex"));
}

#[tokio::test]
async fn streaming_reports_deltas_between_banners() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "Step one")])
        .script("codex", vec![codex(Some("t-1"), "Fine")]);
    let config = WorkflowConfig {
        max_plan_rounds: 1,
        ..WorkflowConfig::default()
    };
    let mut f = fixture(config, runner, vec![Decision::Revise(None)]);
    f.workflow.run("task").await.expect("run");

    assert_eq!(
        f.reporter.entries(),
        vec![
            "start:plan:1",
            "delta:Step one",
            "done:plan:true:Step one",
            "start:plan review:1",
            "delta:Fine",
            "done:plan review:true:Fine",
        ]
    );
}

#[tokio::test]
async fn non_streaming_run_prints_final_text_only() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "Step one")])
        .script("codex", vec![Reply::ok("unstructured progress text\n".into())]);
    let config = WorkflowConfig {
        stream: false,
        max_plan_rounds: 1,
        ..WorkflowConfig::default()
    };
    let mut f = fixture(config, runner, vec![Decision::Revise(None)]);
    f.workflow.run("task").await.expect("run");

    let entries = f.reporter.entries();
    assert!(!entries.iter().any(|e| e.starts_with("delta:")));
    // Extraction missed on the reviewer: raw stdout is shown instead.
    assert!(entries.contains(&"done:plan review:false:unstructured progress text\n".to_string()));
}

#[tokio::test]
async fn unparsed_review_is_shown_but_not_forwarded() {
    let runner = FakeRunner::default()
        .script("claude", vec![claude(Some("gen-1"), "Step one")])
        .script("codex", vec![Reply::ok("unstructured progress text\n".into())]);
    let config = WorkflowConfig {
        max_plan_rounds: 2,
        ..WorkflowConfig::default()
    };
    let mut f = fixture(config, runner, vec![Decision::Revise(None), Decision::Abort]);
    let outcome = f.workflow.run("task").await.expect("run");
    assert!(matches!(
        outcome.status,
        OutcomeStatus::Aborted { stage: Stage::Plan }
    ));

    let revision = &f.runner.calls_to("claude")[1];
    let revision_prompt = revision.stdin.as_deref().unwrap_or_default();
    assert!(!revision_prompt.contains("unstructured progress text"));

    let second_review = &f.runner.calls_to("codex")[1];
    let review_prompt = second_review.stdin.as_deref().unwrap_or_default();
    assert!(review_prompt.contains("Step one"));
    assert!(!review_prompt.contains("unstructured progress text"));

    let seen = f.gate.seen.lock().expect("lock");
    assert_eq!(seen[0].2, "");
    assert!(
        f.reporter
            .entries()
            .contains(&"done:plan review:false:unstructured progress text\n".to_string())
    );
}
