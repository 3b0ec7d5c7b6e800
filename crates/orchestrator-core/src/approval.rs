use std::fmt;

use crate::error::WorkflowError;

/// Phase of the workflow a decision is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Code,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plan => "plan",
            Self::Code => "code",
        })
    }
}

/// What the gate is asked to judge.
#[derive(Debug, Clone, Copy)]
pub struct Proposal<'a> {
    pub stage: Stage,
    pub round: u32,
    /// Rounds allowed for this stage.
    pub max_rounds: u32,
    /// The plan, or the generation actor's summary of its code changes.
    pub content: &'a str,
    pub review: &'a str,
}

impl Proposal<'_> {
    pub fn is_last_round(&self) -> bool {
        self.round >= self.max_rounds
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    /// Send the review back to the generation actor, with optional user direction.
    Revise(Option<String>),
    Abort,
}

/// User approval seam between review and the next step.
#[async_trait::async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn decide(&self, proposal: &Proposal<'_>) -> Result<Decision, WorkflowError>;
}

/// Approves everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait::async_trait]
impl ApprovalGate for AutoApprove {
    async fn decide(&self, proposal: &Proposal<'_>) -> Result<Decision, WorkflowError> {
        tracing::info!(stage = %proposal.stage, round = proposal.round, "auto-approved");
        Ok(Decision::Approve)
    }
}

/// Interprets one line of terminal input.
///
/// `a`/`approve`/`y`/`yes` approve, `q`/`quit`/`abort` abort, `r`/`revise`
/// revises with no extra direction, and any other non-empty text revises
/// with that text as direction. Blank input yields `None` (ask again).
pub fn parse_decision(line: &str) -> Option<Decision> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match trimmed.to_ascii_lowercase().as_str() {
        "a" | "approve" | "y" | "yes" => Decision::Approve,
        "q" | "quit" | "abort" => Decision::Abort,
        "r" | "revise" => Decision::Revise(None),
        _ => Decision::Revise(Some(trimmed.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_answers_map_to_decisions() {
        assert_eq!(parse_decision(" Y \n"), Some(Decision::Approve));
        assert_eq!(parse_decision("quit"), Some(Decision::Abort));
        assert_eq!(parse_decision("r"), Some(Decision::Revise(None)));
        assert_eq!(
            parse_decision("split the parser into its own module"),
            Some(Decision::Revise(Some("split the parser into its own module".into())))
        );
        assert_eq!(parse_decision("   "), None);
    }

    #[tokio::test]
    async fn auto_approve_always_approves() {
        let proposal = Proposal {
            stage: Stage::Code,
            round: 3,
            max_rounds: 3,
            content: "done",
            review: "REVISE: missing tests",
        };
        assert!(proposal.is_last_round());
        assert_eq!(
            AutoApprove.decide(&proposal).await.expect("decision"),
            Decision::Approve
        );
    }
}
