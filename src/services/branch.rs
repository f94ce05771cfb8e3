use crate::error::GitResult;
use crate::git::parser::{self, BranchEntry, FIELD_SEP, GraphEntry};
use crate::git::path_guard::RepositoryContext;
use crate::git::runner::{CommandRunner, CommandSpec};
use crate::services::{run_checked, validate_ref_name};

pub const GRAPH_MAX_COMMITS: usize = 100;

/// Authoritative state after branch creation: the caller learns whether a
/// checkout happened without re-querying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCreated {
    pub name: String,
    pub checked_out: bool,
}

/// Branch listing, creation, switching, deletion, and merging.
#[derive(Debug, Clone)]
pub struct BranchService {
    runner: CommandRunner,
}

impl BranchService {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    /// All local branches with their last commit.
    pub async fn list(&self, ctx: &RepositoryContext) -> GitResult<Vec<BranchEntry>> {
        let sep = FIELD_SEP.to_string();
        let format = ["%(refname:short)", "%(HEAD)", "%(objectname:short)", "%(subject)"]
            .join(&sep);
        let spec = CommandSpec::new(
            "branch-list",
            vec![
                "for-each-ref".to_string(),
                format!("--format={format}"),
                "refs/heads/".to_string(),
            ],
        );
        let result = run_checked(&self.runner, ctx, spec).await?;
        Ok(parser::parse_branches(&result.stdout))
    }

    /// Create a branch, optionally checking it out.
    pub async fn create(
        &self,
        ctx: &RepositoryContext,
        name: &str,
        checkout: bool,
    ) -> GitResult<BranchCreated> {
        validate_ref_name(name)?;
        let spec = if checkout {
            CommandSpec::new("branch-create", ["checkout", "-b", name])
        } else {
            CommandSpec::new("branch-create", ["branch", name])
        };
        run_checked(&self.runner, ctx, spec).await?;
        Ok(BranchCreated {
            name: name.to_string(),
            checked_out: checkout,
        })
    }

    /// Switch to an existing branch.
    pub async fn switch(&self, ctx: &RepositoryContext, name: &str) -> GitResult<()> {
        validate_ref_name(name)?;
        let spec = CommandSpec::new("switch", ["checkout", name]);
        run_checked(&self.runner, ctx, spec).await?;
        Ok(())
    }

    /// Delete a local branch. Deleting the checked-out branch classifies
    /// as `CannotDeleteCurrentBranch`, which the UI explains without AI.
    pub async fn delete(&self, ctx: &RepositoryContext, name: &str, force: bool) -> GitResult<()> {
        validate_ref_name(name)?;
        let flag = if force { "-D" } else { "-d" };
        let spec = CommandSpec::new("branch-delete", ["branch", flag, name]);
        run_checked(&self.runner, ctx, spec).await?;
        Ok(())
    }

    /// Merge `source` into the current branch; returns git's own report.
    pub async fn merge(&self, ctx: &RepositoryContext, source: &str) -> GitResult<String> {
        validate_ref_name(source)?;
        let spec = CommandSpec::new("merge", ["merge", "--no-ff", source]);
        let result = run_checked(&self.runner, ctx, spec).await?;
        Ok(result.stdout)
    }

    /// Simplified commit graph across all refs, for UI rendering.
    pub async fn graph(&self, ctx: &RepositoryContext) -> GitResult<Vec<GraphEntry>> {
        let sep = FIELD_SEP.to_string();
        let format = ["%h", "%s", "%an", "%ci", "%D"].join(&sep);
        let spec = CommandSpec::new(
            "graph",
            vec![
                "log".to_string(),
                "--all".to_string(),
                "--decorate=short".to_string(),
                format!("--format={format}"),
                format!("--max-count={GRAPH_MAX_COMMITS}"),
            ],
        );
        let result = run_checked(&self.runner, ctx, spec).await?;
        Ok(parser::parse_graph(&result.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitError;
    use crate::git::path_guard::PathGuard;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, RepositoryContext) {
        let temp = TempDir::new().unwrap();
        for args in [
            vec!["init", "-b", "main"],
            vec!["config", "user.name", "Test User"],
            vec!["config", "user.email", "test@example.com"],
        ] {
            std::process::Command::new("git")
                .args(&args)
                .current_dir(temp.path())
                .output()
                .unwrap();
        }
        // Branch operations need at least one commit.
        fs::write(temp.path().join("init.txt"), "init").unwrap();
        for args in [vec!["add", "-A"], vec!["commit", "-m", "initial commit"]] {
            std::process::Command::new("git")
                .args(&args)
                .current_dir(temp.path())
                .output()
                .unwrap();
        }
        let guard = PathGuard::new(temp.path()).unwrap();
        let ctx = guard.resolve(".").unwrap();
        (temp, ctx)
    }

    #[tokio::test]
    async fn test_list_marks_current_branch() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        let branches = service.list(&ctx).await.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "main");
        assert!(branches[0].is_current);
        assert_eq!(branches[0].last_commit_message, "initial commit");
    }

    #[tokio::test]
    async fn test_create_with_checkout() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        let created = service.create(&ctx, "feature/x", true).await.unwrap();
        assert!(created.checked_out);

        let branches = service.list(&ctx).await.unwrap();
        let current: Vec<_> = branches.iter().filter(|b| b.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "feature/x");
    }

    #[tokio::test]
    async fn test_create_without_checkout() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        let created = service.create(&ctx, "parked", false).await.unwrap();
        assert!(!created.checked_out);

        let branches = service.list(&ctx).await.unwrap();
        assert!(branches.iter().any(|b| b.name == "parked" && !b.is_current));
    }

    #[tokio::test]
    async fn test_switch_to_missing_branch() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        let result = service.switch(&ctx, "nope").await;
        assert!(matches!(result, Err(GitError::RefNotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_current_branch_fails_distinctly() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        let result = service.delete(&ctx, "main", false).await;
        match result {
            Err(err @ GitError::CannotDeleteCurrentBranch { .. }) => {
                assert!(!err.needs_diagnosis());
            }
            other => panic!("expected CannotDeleteCurrentBranch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_other_branch() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        service.create(&ctx, "doomed", false).await.unwrap();
        service.delete(&ctx, "doomed", false).await.unwrap();

        let branches = service.list(&ctx).await.unwrap();
        assert!(!branches.iter().any(|b| b.name == "doomed"));
    }

    #[tokio::test]
    async fn test_invalid_name_rejected_preflight() {
        let (_temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        let result = service.create(&ctx, "-D", true).await;
        assert!(matches!(result, Err(GitError::InvalidRefName(_))));
        let result = service.delete(&ctx, "a..b", false).await;
        assert!(matches!(result, Err(GitError::InvalidRefName(_))));
    }

    #[tokio::test]
    async fn test_merge_and_graph() {
        let (temp, ctx) = create_test_repo();
        let service = BranchService::new(CommandRunner::new());

        service.create(&ctx, "feature/y", true).await.unwrap();
        fs::write(temp.path().join("y.txt"), "y").unwrap();
        for args in [vec!["add", "-A"], vec!["commit", "-m", "feature work"]] {
            std::process::Command::new("git")
                .args(&args)
                .current_dir(temp.path())
                .output()
                .unwrap();
        }
        service.switch(&ctx, "main").await.unwrap();
        service.merge(&ctx, "feature/y").await.unwrap();

        let graph = service.graph(&ctx).await.unwrap();
        assert!(graph.len() >= 3); // initial + feature + merge commit
        assert!(graph.iter().any(|e| e.refs.iter().any(|r| r.contains("main"))));
    }
}
