use std::io;
use std::path::PathBuf;
use thiserror::Error;

// Import module-level errors for AppError
use crate::config::settings::ConfigError;
use crate::diagnosis::client::DiagnosisError;

/// Errors produced by the git execution pipeline.
///
/// This is a closed taxonomy: pre-flight variants (`PathEscape`,
/// `EmptyMessage`, `InvalidRefName`, `InvalidPath`) are raised before any
/// subprocess is spawned; everything else is produced by the classifier
/// from a failed `CommandResult` and carries the logical operation name
/// plus the raw stderr text, so no information is lost on the way to
/// diagnosis.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GitError {
    #[error("repository path escapes the allowed root: {path}")]
    PathEscape { path: PathBuf },

    #[error("not a git repository ({operation})")]
    NotARepository { operation: String, stderr: String },

    #[error("failed to spawn git for {operation}: {message}")]
    SpawnError { operation: String, message: String },

    #[error("git {operation} timed out")]
    Timeout { operation: String },

    #[error("repository is locked by another git process ({operation})")]
    RepositoryLocked { operation: String, stderr: String },

    #[error("working tree has changes that block {operation}")]
    DirtyWorkingTree { operation: String, stderr: String },

    #[error("merge conflicts must be resolved ({operation})")]
    MergeConflict { operation: String, stderr: String },

    #[error("authentication failed during {operation}")]
    AuthenticationFailed { operation: String, stderr: String },

    #[error("network unreachable during {operation}")]
    NetworkUnreachable { operation: String, stderr: String },

    #[error("reference not found ({operation})")]
    RefNotFound { operation: String, stderr: String },

    #[error("nothing to commit")]
    NothingToCommit { operation: String, stderr: String },

    #[error("cannot delete the currently checked-out branch")]
    CannotDeleteCurrentBranch { operation: String, stderr: String },

    #[error("commit message is empty")]
    EmptyMessage,

    #[error("commit message exceeds {limit} characters")]
    MessageTooLong { limit: usize },

    #[error("invalid ref name: {0:?}")]
    InvalidRefName(String),

    #[error("invalid file path: {0:?}")]
    InvalidPath(String),

    #[error("git {operation} failed: {stderr}")]
    Unknown { operation: String, stderr: String },
}

impl GitError {
    /// Logical operation the failure originated from, where one exists.
    pub fn operation(&self) -> Option<&str> {
        match self {
            GitError::NotARepository { operation, .. }
            | GitError::SpawnError { operation, .. }
            | GitError::Timeout { operation }
            | GitError::RepositoryLocked { operation, .. }
            | GitError::DirtyWorkingTree { operation, .. }
            | GitError::MergeConflict { operation, .. }
            | GitError::AuthenticationFailed { operation, .. }
            | GitError::NetworkUnreachable { operation, .. }
            | GitError::RefNotFound { operation, .. }
            | GitError::NothingToCommit { operation, .. }
            | GitError::CannotDeleteCurrentBranch { operation, .. }
            | GitError::Unknown { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Raw stderr captured from the failed command, where one exists.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            GitError::NotARepository { stderr, .. }
            | GitError::RepositoryLocked { stderr, .. }
            | GitError::DirtyWorkingTree { stderr, .. }
            | GitError::MergeConflict { stderr, .. }
            | GitError::AuthenticationFailed { stderr, .. }
            | GitError::NetworkUnreachable { stderr, .. }
            | GitError::RefNotFound { stderr, .. }
            | GitError::NothingToCommit { stderr, .. }
            | GitError::CannotDeleteCurrentBranch { stderr, .. }
            | GitError::Unknown { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Stable name of the variant, used when building diagnosis prompts.
    pub fn kind_name(&self) -> &'static str {
        match self {
            GitError::PathEscape { .. } => "path_escape",
            GitError::NotARepository { .. } => "not_a_repository",
            GitError::SpawnError { .. } => "spawn_error",
            GitError::Timeout { .. } => "timeout",
            GitError::RepositoryLocked { .. } => "repository_locked",
            GitError::DirtyWorkingTree { .. } => "dirty_working_tree",
            GitError::MergeConflict { .. } => "merge_conflict",
            GitError::AuthenticationFailed { .. } => "authentication_failed",
            GitError::NetworkUnreachable { .. } => "network_unreachable",
            GitError::RefNotFound { .. } => "ref_not_found",
            GitError::NothingToCommit { .. } => "nothing_to_commit",
            GitError::CannotDeleteCurrentBranch { .. } => "cannot_delete_current_branch",
            GitError::EmptyMessage => "empty_message",
            GitError::MessageTooLong { .. } => "message_too_long",
            GitError::InvalidRefName(_) => "invalid_ref_name",
            GitError::InvalidPath(_) => "invalid_path",
            GitError::Unknown { .. } => "unknown",
        }
    }

    /// Lock contention is the one failure the user may simply retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GitError::RepositoryLocked { .. })
    }

    /// Whether AI diagnosis adds anything over the error itself.
    ///
    /// Pre-flight validation failures, lock contention, and the handful of
    /// errors the UI can fully explain on its own never reach the
    /// diagnosis service.
    pub fn needs_diagnosis(&self) -> bool {
        !matches!(
            self,
            GitError::PathEscape { .. }
                | GitError::SpawnError { .. }
                | GitError::RepositoryLocked { .. }
                | GitError::NothingToCommit { .. }
                | GitError::CannotDeleteCurrentBranch { .. }
                | GitError::EmptyMessage
                | GitError::MessageTooLong { .. }
                | GitError::InvalidRefName(_)
                | GitError::InvalidPath(_)
        )
    }
}

/// Top-level application error that wraps all module-specific errors
///
/// This provides a unified error type for application-level code while
/// preserving the specific error context from each module. All module
/// errors automatically convert to AppError via the `From` trait.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Diagnosis error: {0}")]
    Diagnosis(#[from] DiagnosisError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(operation: &str, stderr: &str) -> GitError {
        GitError::AuthenticationFailed {
            operation: operation.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_operation_and_stderr_accessors() {
        let err = classified("push", "fatal: Authentication failed");
        assert_eq!(err.operation(), Some("push"));
        assert_eq!(err.stderr(), Some("fatal: Authentication failed"));
    }

    #[test]
    fn test_preflight_errors_have_no_operation() {
        assert_eq!(GitError::EmptyMessage.operation(), None);
        assert_eq!(GitError::InvalidRefName("-d".into()).stderr(), None);
    }

    #[test]
    fn test_only_lock_contention_is_retryable() {
        let locked = GitError::RepositoryLocked {
            operation: "commit".into(),
            stderr: "index.lock exists".into(),
        };
        assert!(locked.is_retryable());
        assert!(!classified("push", "").is_retryable());
        assert!(!GitError::EmptyMessage.is_retryable());
    }

    #[test]
    fn test_locally_explained_errors_skip_diagnosis() {
        let delete = GitError::CannotDeleteCurrentBranch {
            operation: "branch-delete".into(),
            stderr: "error: Cannot delete branch 'main'".into(),
        };
        assert!(!delete.needs_diagnosis());
        assert!(!GitError::EmptyMessage.needs_diagnosis());
        assert!(
            !GitError::PathEscape {
                path: "/etc".into()
            }
            .needs_diagnosis()
        );
        assert!(classified("push", "").needs_diagnosis());
        assert!(
            GitError::Unknown {
                operation: "merge".into(),
                stderr: "boom".into()
            }
            .needs_diagnosis()
        );
    }

    #[test]
    fn test_app_error_from_git_error() {
        let app: AppError = GitError::EmptyMessage.into();
        assert!(matches!(app, AppError::Git(GitError::EmptyMessage)));
    }
}
