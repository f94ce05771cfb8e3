use crate::error::GitResult;
use crate::git::parser::{self, FileEntry};
use crate::git::path_guard::RepositoryContext;
use crate::git::runner::{CommandRunner, CommandSpec};
use crate::services::{run_checked, validate_file_path};

pub const DEFAULT_MAX_DIFF_BYTES: usize = 50_000;

const DIFF_TRUNCATION_MARKER: &str = "\n\n[diff truncated: too large]";

/// Structured view of the working tree and index.
///
/// Staged and unstaged are independent views of the same porcelain
/// listing: a partially staged file appears in both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub branch: String,
    pub ahead: u32,
    pub behind: u32,
    pub staged: Vec<FileEntry>,
    pub unstaged: Vec<FileEntry>,
    pub untracked: Vec<FileEntry>,
}

impl RepoStatus {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }
}

/// Working-tree status and staging operations.
#[derive(Debug, Clone)]
pub struct StatusService {
    runner: CommandRunner,
    max_diff_bytes: usize,
}

impl StatusService {
    pub fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            max_diff_bytes: DEFAULT_MAX_DIFF_BYTES,
        }
    }

    /// Override the staged-diff byte cap (the diff may be sent to the
    /// diagnosis service, so it is bounded independently of the runner's
    /// general output cap).
    pub fn with_diff_cap(mut self, max_diff_bytes: usize) -> Self {
        self.max_diff_bytes = max_diff_bytes;
        self
    }

    pub async fn status(&self, ctx: &RepositoryContext) -> GitResult<RepoStatus> {
        let spec = CommandSpec::new("status", ["status", "--porcelain=v1", "--branch"]);
        let result = run_checked(&self.runner, ctx, spec).await?;
        let report = parser::parse_status(&result.stdout);

        let staged = report
            .entries
            .iter()
            .filter(|e| e.is_staged())
            .cloned()
            .collect();
        let unstaged = report
            .entries
            .iter()
            .filter(|e| e.is_unstaged())
            .cloned()
            .collect();
        let untracked = report
            .entries
            .iter()
            .filter(|e| e.is_untracked())
            .cloned()
            .collect();

        Ok(RepoStatus {
            branch: report.branch,
            ahead: report.ahead,
            behind: report.behind,
            staged,
            unstaged,
            untracked,
        })
    }

    /// Stage a single file, given as a path relative to the repo root.
    pub async fn stage_file(&self, ctx: &RepositoryContext, path: &str) -> GitResult<()> {
        validate_file_path(path)?;
        let spec = CommandSpec::new("stage", ["add", "--", path]);
        run_checked(&self.runner, ctx, spec).await?;
        Ok(())
    }

    pub async fn unstage_file(&self, ctx: &RepositoryContext, path: &str) -> GitResult<()> {
        validate_file_path(path)?;
        let spec = CommandSpec::new("unstage", ["restore", "--staged", "--", path]);
        run_checked(&self.runner, ctx, spec).await?;
        Ok(())
    }

    pub async fn stage_all(&self, ctx: &RepositoryContext) -> GitResult<()> {
        let spec = CommandSpec::new("stage-all", ["add", "-A"]);
        run_checked(&self.runner, ctx, spec).await?;
        Ok(())
    }

    /// Diff of staged changes, capped at the configured byte limit with a
    /// visible truncation marker.
    pub async fn staged_diff(&self, ctx: &RepositoryContext) -> GitResult<String> {
        let spec = CommandSpec::new("diff", ["diff", "--cached"]);
        let result = run_checked(&self.runner, ctx, spec).await?;

        let mut diff = result.stdout;
        if diff.len() > self.max_diff_bytes {
            let mut cut = self.max_diff_bytes;
            while !diff.is_char_boundary(cut) {
                cut -= 1;
            }
            diff.truncate(cut);
            diff.push_str(DIFF_TRUNCATION_MARKER);
        }
        Ok(diff)
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
        let guard = PathGuard::new(temp.path()).unwrap();
        let ctx = guard.resolve(".").unwrap();
        (temp, ctx)
    }

    #[tokio::test]
    async fn test_status_clean_repo() {
        let (_temp, ctx) = create_test_repo();
        let service = StatusService::new(CommandRunner::new());

        let status = service.status(&ctx).await.unwrap();
        assert_eq!(status.branch, "main");
        assert!(status.is_clean());
    }

    #[tokio::test]
    async fn test_untracked_then_staged() {
        let (temp, ctx) = create_test_repo();
        let service = StatusService::new(CommandRunner::new());

        fs::write(temp.path().join("new.txt"), "content").unwrap();

        let status = service.status(&ctx).await.unwrap();
        assert_eq!(status.untracked.len(), 1);
        assert_eq!(status.untracked[0].path, "new.txt");
        assert!(status.staged.is_empty());

        service.stage_file(&ctx, "new.txt").await.unwrap();

        let status = service.status(&ctx).await.unwrap();
        assert!(status.untracked.is_empty());
        assert_eq!(status.staged.len(), 1);
    }

    #[tokio::test]
    async fn test_stage_file_with_spaces() {
        let (temp, ctx) = create_test_repo();
        let service = StatusService::new(CommandRunner::new());

        fs::write(temp.path().join("a b.txt"), "content").unwrap();
        service.stage_file(&ctx, "a b.txt").await.unwrap();

        let status = service.status(&ctx).await.unwrap();
        assert_eq!(status.staged.len(), 1);
        assert_eq!(status.staged[0].path, "a b.txt");
    }

    #[tokio::test]
    async fn test_flag_like_path_rejected_preflight() {
        let (_temp, ctx) = create_test_repo();
        let service = StatusService::new(CommandRunner::new());

        let result = service.stage_file(&ctx, "--all").await;
        assert!(matches!(result, Err(GitError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_unstage_file() {
        let (temp, ctx) = create_test_repo();
        let service = StatusService::new(CommandRunner::new());

        // restore --staged needs a HEAD commit to restore from.
        fs::write(temp.path().join("base.txt"), "base").unwrap();
        service.stage_all(&ctx).await.unwrap();
        std::process::Command::new("git")
            .args(["commit", "-m", "base"])
            .current_dir(temp.path())
            .output()
            .unwrap();

        fs::write(temp.path().join("base.txt"), "changed").unwrap();
        service.stage_file(&ctx, "base.txt").await.unwrap();
        assert_eq!(service.status(&ctx).await.unwrap().staged.len(), 1);

        service.unstage_file(&ctx, "base.txt").await.unwrap();
        let status = service.status(&ctx).await.unwrap();
        assert!(status.staged.is_empty());
        assert_eq!(status.unstaged.len(), 1);
    }

    #[tokio::test]
    async fn test_staged_diff_truncation() {
        let (temp, ctx) = create_test_repo();
        let service = StatusService::new(CommandRunner::new()).with_diff_cap(64);

        fs::write(temp.path().join("big.txt"), "line\n".repeat(200)).unwrap();
        service.stage_all(&ctx).await.unwrap();

        let diff = service.staged_diff(&ctx).await.unwrap();
        assert!(diff.ends_with(DIFF_TRUNCATION_MARKER));
        assert!(diff.len() <= 64 + DIFF_TRUNCATION_MARKER.len());
    }
}
