use crate::audit::AuditLogger;
use crate::error::{GitError, GitResult};
use crate::git::path_guard::RepositoryContext;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Sentinel exit code reported when a command is killed on timeout.
/// Real process exits are >= 0 and signal deaths map to -1, so this value
/// can never collide with anything git reports.
pub const TIMEOUT_EXIT_CODE: i32 = -64;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// One git invocation: a logical operation name plus discrete argument
/// strings. Arguments are never joined into a shell string; user-supplied
/// text (paths, branch names, messages) stays opaque all the way to execve.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    operation: &'static str,
    args: Vec<String>,
    max_output_bytes: Option<usize>,
}

impl CommandSpec {
    pub fn new<I, S>(operation: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operation,
            args: args.into_iter().map(Into::into).collect(),
            max_output_bytes: None,
        }
    }

    /// Override the runner's default captured-output cap for this command.
    pub fn with_output_cap(mut self, bytes: usize) -> Self {
        self.max_output_bytes = Some(bytes);
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Captured outcome of a git invocation. A non-zero exit code is normal
/// data here, not an error; only the classifier decides what it means.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }
}

/// Executes git commands against a validated repository context.
///
/// Cheap to clone; holds no per-repository state, so one runner serves any
/// number of concurrent requests.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    max_output_bytes: usize,
    audit: Option<Arc<AuditLogger>>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            audit: None,
        }
    }

    pub fn with_limits(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
            audit: None,
        }
    }

    /// Record every invocation (operation, argv, repo, exit code) in the
    /// audit log. Logging failures never fail the command itself.
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Run a git command and capture its output.
    ///
    /// Spawn failures (binary missing, permission denied) are the only
    /// error path; everything the child itself does, including failing or
    /// timing out, comes back as a `CommandResult`.
    pub async fn run(
        &self,
        ctx: &RepositoryContext,
        spec: &CommandSpec,
    ) -> GitResult<CommandResult> {
        let started = Instant::now();
        let cap = spec.max_output_bytes.unwrap_or(self.max_output_bytes);

        let mut command = Command::new("git");
        command
            .args(spec.args())
            .current_dir(ctx.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            // Never prompt for credentials; a hung child must not wait on
            // terminal input it will never get.
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        // Minimal inherited environment, per the scrubbing contract.
        if let Ok(path) = std::env::var("PATH") {
            command.env("PATH", path);
        }
        if let Ok(home) = std::env::var("HOME") {
            command.env("HOME", home);
        }

        let mut child = command
            .spawn()
            .map_err(|e| GitError::SpawnError {
                operation: spec.operation().to_string(),
                message: e.to_string(),
            })?;

        let stdout_pipe = child.stdout.take().ok_or_else(|| GitError::SpawnError {
            operation: spec.operation().to_string(),
            message: "stdout pipe unavailable".to_string(),
        })?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| GitError::SpawnError {
            operation: spec.operation().to_string(),
            message: "stderr pipe unavailable".to_string(),
        })?;

        let work = async move {
            let (stdout, stderr, status) = tokio::join!(
                read_capped(stdout_pipe, cap),
                read_capped(stderr_pipe, cap),
                child.wait(),
            );
            let status = status?;
            Ok::<_, std::io::Error>((stdout?, stderr?, status))
        };

        let result = match timeout(self.timeout, work).await {
            Ok(Ok((stdout, stderr, status))) => CommandResult {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                duration: started.elapsed(),
            },
            Ok(Err(e)) => {
                return Err(GitError::SpawnError {
                    operation: spec.operation().to_string(),
                    message: e.to_string(),
                });
            }
            // Dropping the future drops the child, and kill_on_drop reaps
            // it. The sentinel exit code routes to the Timeout variant in
            // the classifier.
            Err(_) => CommandResult {
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: String::new(),
                duration: started.elapsed(),
            },
        };

        if let Some(audit) = &self.audit {
            let _ = audit.log_command(spec.operation(), spec.args(), ctx.path(), result.exit_code);
        }

        Ok(result)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a pipe to EOF while keeping at most `cap` bytes in memory.
/// The pipe is always drained so a chatty child never blocks on a full
/// buffer; excess bytes are discarded, not stored.
async fn read_capped<R>(mut reader: R, cap: usize) -> std::io::Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        if buf.len() < cap {
            let take = n.min(cap - buf.len());
            buf.extend_from_slice(&chunk[..take]);
        }
    }
    Ok(buf)
}
