use crate::error::{GitError, GitResult};
use crate::git::parser::{self, CommitEntry, FIELD_SEP};
use crate::git::path_guard::RepositoryContext;
use crate::git::runner::{CommandRunner, CommandSpec};
use crate::services::{run_checked, validate_ref_name};

pub const MAX_MESSAGE_CHARS: usize = 4096;
pub const MAX_LOG_LIMIT: usize = 200;

/// Authoritative state after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub short_sha: String,
}

/// Commit creation and history reads.
#[derive(Debug, Clone)]
pub struct CommitService {
    runner: CommandRunner,
}

impl CommitService {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    /// Create a commit and return its short SHA.
    ///
    /// The message is stripped of control characters before it becomes a
    /// command argument; it is passed as one discrete argument either way,
    /// so this is defence in depth, not the injection barrier.
    pub async fn commit(&self, ctx: &RepositoryContext, message: &str) -> GitResult<CommitOutcome> {
        let clean = sanitize_message(message);
        if clean.is_empty() {
            return Err(GitError::EmptyMessage);
        }
        if clean.chars().count() > MAX_MESSAGE_CHARS {
            return Err(GitError::MessageTooLong {
                limit: MAX_MESSAGE_CHARS,
            });
        }

        let spec = CommandSpec::new("commit", vec!["commit".to_string(), "-m".to_string(), clean]);
        run_checked(&self.runner, ctx, spec).await?;

        let spec = CommandSpec::new("rev-parse", ["rev-parse", "--short", "HEAD"]);
        let head = run_checked(&self.runner, ctx, spec).await?;
        Ok(CommitOutcome {
            short_sha: head.stdout.trim().to_string(),
        })
    }

    /// Read the commit log, newest first. `limit` is clamped to a sane
    /// range; an optional branch filter is validated before it becomes an
    /// argument.
    pub async fn log(
        &self,
        ctx: &RepositoryContext,
        limit: usize,
        branch: Option<&str>,
    ) -> GitResult<Vec<CommitEntry>> {
        let limit = limit.clamp(1, MAX_LOG_LIMIT);
        let sep = FIELD_SEP.to_string();
        let format = ["%H", "%h", "%an", "%ae", "%ci", "%s"].join(&sep);

        let mut args = vec![
            "log".to_string(),
            format!("--format={format}"),
            format!("-{limit}"),
        ];
        if let Some(branch) = branch {
            validate_ref_name(branch)?;
            args.push(branch.to_string());
        }

        let result = run_checked(&self.runner, ctx, CommandSpec::new("log", args)).await?;
        Ok(parser::parse_log(&result.stdout))
    }
}

/// Strip NUL and control characters from a commit message, keeping
/// newlines and tabs, then trim surrounding whitespace.
fn sanitize_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}
