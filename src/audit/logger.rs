use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Append-only audit trail of git executions and rejected auto-fix
/// candidates. One line per event, rotated once the file grows past
/// `MAX_LOG_SIZE`.
#[derive(Debug)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a new AuditLogger with the default log path
    pub fn new() -> std::io::Result<Self> {
        Self::with_path(Self::default_log_path()?)
    }

    /// Create an AuditLogger with a custom log path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        // Ensure directory exists
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { log_path })
    }

    /// Get the default log path: ~/.config/gitsage/history.log
    fn default_log_path() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gitsage")
            .join("history.log"))
    }

    /// Log one executed git command with its exit code.
    pub fn log_command(
        &self,
        operation: &str,
        args: &[String],
        repo_path: &Path,
        exit_code: i32,
    ) -> std::io::Result<()> {
        let entry = format!(
            "[{}] [{}] [{}] [exit:{}] {} git {}\n",
            Utc::now().to_rfc3339(),
            current_user(),
            repo_path.display(),
            exit_code,
            operation,
            args.join(" "),
        );
        self.append(&entry)
    }

    /// Log an auto-fix candidate the whitelist rejected, for forensics.
    ///
    /// Records when AI output fails the safety check; this is how
    /// prompt-injection attempts become visible after the fact.
    pub fn log_rejected_fix(
        &self,
        proposed: &str,
        reason: &str,
        repo_path: &Path,
    ) -> std::io::Result<()> {
        let entry = format!(
            "[{}] [{}] [{}] [FIX-REJECTED] proposed=\"{}\" reason=\"{}\"\n",
            Utc::now().to_rfc3339(),
            current_user(),
            repo_path.display(),
            proposed,
            reason,
        );
        self.append(&entry)
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(entry.as_bytes())?;
        file.flush()
    }

    /// Rotate log file if it exceeds MAX_LOG_SIZE
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            // Rotate: history.log -> history.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

fn current_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}
