pub mod branch;
pub mod commit;
pub mod remote;
pub mod status;

pub use branch::{BranchCreated, BranchService};
pub use commit::{CommitOutcome, CommitService};
pub use remote::RemoteService;
pub use status::{RepoStatus, StatusService};

use crate::error::{GitError, GitResult};
use crate::git::classifier::classify;
use crate::git::path_guard::RepositoryContext;
use crate::git::runner::{CommandResult, CommandRunner, CommandSpec};

/// Run a command and classify a failure.
///
/// The one place the classifier is invoked: a successful result passes
/// through untouched, so exit code 0 can never produce a `GitError`.
pub(crate) async fn run_checked(
    runner: &CommandRunner,
    ctx: &RepositoryContext,
    spec: CommandSpec,
) -> GitResult<CommandResult> {
    let result = runner.run(ctx, &spec).await?;
    if result.success() {
        Ok(result)
    } else {
        Err(classify(spec.operation(), &result))
    }
}

/// Rough check that a branch/ref/remote name is safe to pass as a git
/// argument. Rejects everything git's ref grammar forbids plus anything
/// that could be mistaken for a flag.
pub(crate) fn validate_ref_name(name: &str) -> GitResult<()> {
    let forbidden = [
        " ", "\t", "\n", "\0", "\\", "..", "~", "^", ":", "?", "*", "[",
    ];
    if name.is_empty()
        || name.len() > 250
        || name.starts_with('-')
        || forbidden.iter().any(|c| name.contains(c))
    {
        return Err(GitError::InvalidRefName(name.to_string()));
    }
    Ok(())
}

/// Reject file-path arguments that could be parsed as flags or smuggle a
/// NUL. Everything else stays opaque; paths with spaces or shell
/// metacharacters are legitimate file names here.
pub(crate) fn validate_file_path(path: &str) -> GitResult<()> {
    if path.is_empty() || path.starts_with('-') || path.contains('\0') {
        return Err(GitError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ref_names() {
        assert!(validate_ref_name("main").is_ok());
        assert!(validate_ref_name("feature/my-feature").is_ok());
        assert!(validate_ref_name("release-1.2").is_ok());
    }

    #[test]
    fn test_invalid_ref_names() {
        for name in [
            "",
            "-d",
            "branch name",
            "branch..name",
            "branch~1",
            "branch^2",
            "a:b",
            "what?",
            "glob*",
            "set[1]",
            "back\\slash",
            "nul\0byte",
        ] {
            assert!(
                matches!(validate_ref_name(name), Err(GitError::InvalidRefName(_))),
                "should reject {name:?}"
            );
        }
        let long = "a".repeat(251);
        assert!(validate_ref_name(&long).is_err());
    }

    #[test]
    fn test_file_path_validation() {
        assert!(validate_file_path("a b.txt").is_ok());
        assert!(validate_file_path("src/main.rs").is_ok());
        assert!(validate_file_path("weird;name|here.txt").is_ok());
        assert!(matches!(
            validate_file_path("--force"),
            Err(GitError::InvalidPath(_))
        ));
        assert!(validate_file_path("").is_err());
        assert!(validate_file_path("nul\0.txt").is_err());
    }
}
