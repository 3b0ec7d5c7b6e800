pub mod approval;
pub mod config;
pub mod error;
pub mod observability;
pub mod prompts;
pub mod report;
pub mod run;
pub mod workflow;
pub mod workspace;

// User-facing API: configure, pick the seams, run.
pub use approval::{ApprovalGate, AutoApprove, Decision, Proposal, Stage, parse_decision};
pub use config::{BackendConfig, WorkflowConfig};
pub use error::WorkflowError;
pub use observability::init_observability;
pub use report::Reporter;
pub use run::{Outcome, OutcomeStatus, RunState, WorkflowRun};
pub use workflow::{PairWorkflow, Step};
pub use workspace::{GitWorkspace, WorkspaceInspector, WorkspaceSnapshot};
