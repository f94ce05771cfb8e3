use crate::error::GitError;
use crate::git::runner::CommandResult;

/// Map a failed `CommandResult` to exactly one `GitError` variant.
///
/// Pure function over the exit code and stderr text. First match wins, and
/// the ordering matters: lock contention and repository detection come
/// before the content-level failures, and `Unknown` is the total fallback
/// so every failure classifies to something. The raw stderr rides along on
/// every variant for the diagnosis step.
pub fn classify(operation: &str, result: &CommandResult) -> GitError {
    debug_assert!(!result.success(), "classifier invoked on a successful result");

    if result.timed_out() {
        return GitError::Timeout {
            operation: operation.to_string(),
        };
    }

    // git reports a few failures (notably "nothing to commit") on stdout
    // with an empty stderr; fall back so they still classify.
    let stderr = if result.stderr.trim().is_empty() {
        result.stdout.clone()
    } else {
        result.stderr.clone()
    };
    let lower = stderr.to_lowercase();
    let operation = operation.to_string();

    if lower.contains("not a git repository") {
        return GitError::NotARepository { operation, stderr };
    }

    if lower.contains("index.lock")
        || lower.contains("another git process seems to be running")
        || (lower.contains("unable to create") && lower.contains(".lock"))
    {
        return GitError::RepositoryLocked { operation, stderr };
    }

    if lower.contains("fix conflicts")
        || lower.contains("merge conflict")
        || lower.contains("needs merge")
        || lower.contains("unmerged files")
        || stderr.contains("CONFLICT (")
    {
        return GitError::MergeConflict { operation, stderr };
    }

    if lower.contains("would be overwritten")
        || lower.contains("local changes")
        || lower.contains("commit your changes or stash them")
    {
        return GitError::DirtyWorkingTree { operation, stderr };
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("could not read username")
        || lower.contains("could not read password")
        || lower.contains("invalid credentials")
    {
        return GitError::AuthenticationFailed { operation, stderr };
    }

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
    {
        return GitError::NetworkUnreachable { operation, stderr };
    }

    // git's own message when asked to delete the checked-out branch.
    if lower.contains("cannot delete branch") && lower.contains("checked out") {
        return GitError::CannotDeleteCurrentBranch { operation, stderr };
    }

    if lower.contains("unknown revision")
        || lower.contains("did not match any")
        || lower.contains("not something we can merge")
        || lower.contains("no such branch")
        || lower.contains("couldn't find remote ref")
        || lower.contains("not a valid ref")
    {
        return GitError::RefNotFound { operation, stderr };
    }

    if lower.contains("nothing to commit") || lower.contains("nothing added to commit") {
        return GitError::NothingToCommit { operation, stderr };
    }

    GitError::Unknown { operation, stderr }
}
