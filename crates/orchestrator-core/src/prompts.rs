//! Prompt templates for each workflow step.

use crate::workspace::WorkspaceSnapshot;

pub fn plan(task: &str) -> String {
    format!(
        "You are planning a change to the repository in the current directory.\n\
         Do not edit any files yet.\n\n\
         Task:\n{task}\n\n\
         Write a concrete implementation plan: the files to touch, the changes in each, \
         and how the result will be tested."
    )
}

pub fn plan_revision(review: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "A reviewer read your plan. Revise it to address the review.\n\
         Do not edit any files yet. Reply with the complete revised plan.\n\n\
         Review:\n{review}"
    );
    push_feedback(&mut prompt, feedback);
    prompt
}

pub fn plan_review(task: &str, plan: &str, round: u32) -> String {
    format!(
        "Review the following implementation plan (revision {round}). You may read the \
         repository but must not modify it.\n\n\
         Task:\n{task}\n\n\
         Plan:\n{plan}\n\n\
         Point out missing steps, risks, and incorrect assumptions. End with a one-line verdict: \
         APPROVE or REVISE."
    )
}

pub fn implement(plan: &str) -> String {
    format!(
        "The plan below was approved. Implement it now by editing the repository.\n\n\
         Approved plan:\n{plan}\n\n\
         When you are done, summarize what you changed."
    )
}

pub fn code_fix(review: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "A reviewer examined your changes. Address the review by editing the repository.\n\n\
         Review:\n{review}"
    );
    push_feedback(&mut prompt, feedback);
    prompt.push_str("\n\nWhen you are done, summarize what you changed.");
    prompt
}

pub fn code_review(task: &str, plan: &str, snapshot: &WorkspaceSnapshot, round: u32) -> String {
    format!(
        "Review the uncommitted changes in this repository (round {round}). You may read the \
         repository but must not modify it.\n\n\
         Task:\n{task}\n\n\
         Approved plan:\n{plan}\n\n\
         {changes}\n\n\
         Check correctness, completeness against the plan, and test coverage. End with a \
         one-line verdict: APPROVE or REVISE.",
        changes = snapshot.render()
    )
}

fn push_feedback(prompt: &mut String, feedback: Option<&str>) {
    if let Some(feedback) = feedback.map(str::trim).filter(|f| !f.is_empty()) {
        prompt.push_str("\n\nAdditional direction from the user:\n");
        prompt.push_str(feedback);
    }
}
