use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::WorkflowError;

/// Longest diff embedded into a review prompt, in characters.
const DIFF_LIMIT: usize = 60_000;

/// Uncommitted state of the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    /// `git status --porcelain` output.
    pub status: String,
    /// Diff of tracked files against `HEAD`.
    pub diff: String,
}

impl WorkspaceSnapshot {
    pub fn is_clean(&self) -> bool {
        self.status.trim().is_empty() && self.diff.trim().is_empty()
    }

    /// Text block embedded into review prompts.
    pub fn render(&self) -> String {
        if self.is_clean() {
            return "Changes:\n(no uncommitted changes)".to_string();
        }
        let diff = match self.diff.char_indices().nth(DIFF_LIMIT) {
            Some((cut, _)) => format!("{}\n[diff truncated]", &self.diff[..cut]),
            None => self.diff.clone(),
        };
        format!(
            "Status:\n{}\n\nDiff:\n```diff\n{}\n```",
            self.status.trim_end(),
            diff.trim_end()
        )
    }
}

/// Source of the changes the code reviewer is shown.
#[async_trait::async_trait]
pub trait WorkspaceInspector: Send + Sync {
    async fn snapshot(&self) -> Result<WorkspaceSnapshot, WorkflowError>;
}

/// Reads the working tree with the `git` binary.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    root: PathBuf,
}

impl GitWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output, WorkflowError> {
        Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .arg("--no-pager")
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| WorkflowError::workspace(format!("failed to run git: {e}")))
    }
}

#[async_trait::async_trait]
impl WorkspaceInspector for GitWorkspace {
    async fn snapshot(&self) -> Result<WorkspaceSnapshot, WorkflowError> {
        let status = self.git(&["status", "--porcelain"]).await?;
        if !status.status.success() {
            return Err(WorkflowError::workspace(format!(
                "git status failed in {}: {}",
                self.root.display(),
                String::from_utf8_lossy(&status.stderr).trim()
            )));
        }

        let mut diff = self.git(&["diff", "HEAD"]).await?;
        if !diff.status.success() {
            // No commits yet: diff the index instead.
            tracing::debug!(root = %self.root.display(), "git diff HEAD failed; falling back to git diff");
            diff = self.git(&["diff"]).await?;
        }
        Ok(WorkspaceSnapshot {
            status: String::from_utf8_lossy(&status.stdout).into_owned(),
            diff: String::from_utf8_lossy(&diff.stdout).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_snapshot_renders_placeholder() {
        let snapshot = WorkspaceSnapshot::default();
        assert!(snapshot.is_clean());
        assert!(snapshot.render().contains("no uncommitted changes"));
    }

    #[test]
    fn long_diffs_are_truncated() {
        let snapshot = WorkspaceSnapshot {
            status: " M a.rs".into(),
            diff: "+x\n".repeat(DIFF_LIMIT),
        };
        let rendered = snapshot.render();
        assert!(rendered.contains("[diff truncated]"));
        assert!(rendered.len() < snapshot.diff.len() + 100);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn git_workspace_reports_status_and_diff() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        let git = |args: &[&str]| {
            std::process::Command::new("git")
                .arg("-C")
                .arg(root)
                .args(args)
                .output()
                .expect("git")
        };
        if !git(&["init", "-q"]).status.success() {
            return;
        }
        git(&["config", "user.email", "dev@example.com"]);
        git(&["config", "user.name", "dev"]);
        std::fs::write(root.join("lib.rs"), "fn a() {}\n").expect("write");
        git(&["add", "."]);
        git(&["commit", "-q", "-m", "init"]);
        std::fs::write(root.join("lib.rs"), "fn a() {}\nfn b() {}\n").expect("write");

        let snapshot = GitWorkspace::new(root).snapshot().await.expect("snapshot");
        assert!(snapshot.status.contains("lib.rs"));
        assert!(snapshot.diff.contains("+fn b() {}"));
    }

    #[tokio::test]
    async fn non_repository_is_a_workspace_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        match GitWorkspace::new(dir.path()).snapshot().await {
            Err(WorkflowError::Workspace(_)) => {}
            Ok(_) => panic!("a plain directory is not a repository"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
