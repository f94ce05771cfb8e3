use crate::audit::AuditLogger;
use crate::diagnosis::client::{DiagnosisClient, DiagnosisError, strip_code_fences};
use crate::error::GitError;
use crate::security::{FixWhitelist, SafeCommand};
use std::path::Path;
use std::sync::Arc;

/// A diagnosis whose auto-fix has been vetted. `safe_fix` is either a
/// whitelisted argv or absent; raw model text never reaches callers.
#[derive(Debug, Clone)]
pub struct VettedDiagnosis {
    pub explanation: String,
    pub steps: Vec<String>,
    pub safe_fix: Option<SafeCommand>,
}

/// Orchestrates diagnosis for classified failures.
///
/// Diagnosis is strictly advisory: any failure here degrades to `None`
/// and the original `GitError` stands on its own.
pub struct ErrorMedic {
    client: Box<dyn DiagnosisClient>,
    whitelist: FixWhitelist,
    audit: Option<Arc<AuditLogger>>,
}

impl ErrorMedic {
    pub fn new(client: Box<dyn DiagnosisClient>) -> Self {
        Self {
            client,
            whitelist: FixWhitelist::new(),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Diagnose a failure, vetting any proposed auto-fix.
    ///
    /// Returns `None` for errors that are self-explanatory or carry no
    /// command output worth explaining, and for any diagnosis failure.
    pub async fn diagnose(&self, error: &GitError, repo_path: &Path) -> Option<VettedDiagnosis> {
        if !error.needs_diagnosis() {
            return None;
        }

        let diagnosis = match self.client.diagnose(error).await {
            Ok(diagnosis) => diagnosis,
            Err(_) => return None,
        };

        let safe_fix = diagnosis.auto_fix.as_deref().and_then(|proposed| {
            let vetted = self.whitelist.sanitize(proposed);
            if vetted.is_none() {
                if let Some(audit) = &self.audit {
                    let _ = audit.log_rejected_fix(proposed, "not in whitelist", repo_path);
                }
            }
            vetted
        });

        Some(VettedDiagnosis {
            explanation: diagnosis.explanation,
            steps: diagnosis.steps,
            safe_fix,
        })
    }

    /// Draft a commit message for a staged diff (already capped by the
    /// status service). Unlike `diagnose`, this is user-initiated, so
    /// failures surface instead of degrading.
    pub async fn suggest_commit_message(&self, diff: &str) -> Result<String, DiagnosisError> {
        if diff.trim().is_empty() {
            return Err(DiagnosisError::EmptyDiff);
        }

        let raw = self.client.generate_commit_message(diff).await?;
        let message = strip_code_fences(&raw);
        if message.is_empty() {
            return Err(DiagnosisError::InvalidResponse(
                "Empty commit message".to_string(),
            ));
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::client::{Diagnosis, DiagnosisError};
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FixedClient {
        auto_fix: Option<String>,
        commit_message: String,
    }

    impl FixedClient {
        fn with_fix(auto_fix: Option<String>) -> Self {
            Self {
                auto_fix,
                commit_message: "feat: canned message".to_string(),
            }
        }
    }

    #[async_trait]
    impl DiagnosisClient for FixedClient {
        async fn diagnose(&self, _error: &GitError) -> Result<Diagnosis, DiagnosisError> {
            Ok(Diagnosis {
                explanation: "The remote rejected the push.".to_string(),
                steps: vec!["Pull the remote changes first".to_string()],
                auto_fix: self.auto_fix.clone(),
            })
        }

        async fn generate_commit_message(&self, _diff: &str) -> Result<String, DiagnosisError> {
            Ok(self.commit_message.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl DiagnosisClient for FailingClient {
        async fn diagnose(&self, _error: &GitError) -> Result<Diagnosis, DiagnosisError> {
            Err(DiagnosisError::Timeout)
        }

        async fn generate_commit_message(&self, _diff: &str) -> Result<String, DiagnosisError> {
            Err(DiagnosisError::Timeout)
        }
    }

    fn network_error() -> GitError {
        GitError::NetworkUnreachable {
            operation: "push".to_string(),
            stderr: "fatal: unable to access remote".to_string(),
        }
    }

    #[tokio::test]
    async fn test_safe_fix_passes_through() {
        let medic = ErrorMedic::new(Box::new(FixedClient::with_fix(Some(
            "git pull --rebase".to_string(),
        ))));
        let vetted = medic
            .diagnose(&network_error(), &PathBuf::from("/tmp/repo"))
            .await
            .unwrap();
        assert_eq!(vetted.explanation, "The remote rejected the push.");
        let fix = vetted.safe_fix.unwrap();
        assert_eq!(fix.args(), &["pull", "--rebase"]);
    }

    #[tokio::test]
    async fn test_unsafe_fix_dropped_but_diagnosis_kept() {
        let medic = ErrorMedic::new(Box::new(FixedClient::with_fix(Some(
            "git push --force origin main; rm -rf /".to_string(),
        ))));
        let vetted = medic
            .diagnose(&network_error(), &PathBuf::from("/tmp/repo"))
            .await
            .unwrap();
        assert!(vetted.safe_fix.is_none());
        assert_eq!(vetted.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_client_failure_degrades_to_none() {
        let medic = ErrorMedic::new(Box::new(FailingClient));
        assert!(
            medic
                .diagnose(&network_error(), &PathBuf::from("/tmp/repo"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_self_explanatory_errors_skip_diagnosis() {
        let medic =
            ErrorMedic::new(Box::new(FixedClient::with_fix(Some("git fetch".to_string()))));
        let error = GitError::NothingToCommit {
            operation: "commit".to_string(),
            stderr: "nothing to commit, working tree clean".to_string(),
        };
        assert!(
            medic
                .diagnose(&error, &PathBuf::from("/tmp/repo"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_commit_message_from_diff() {
        let medic = ErrorMedic::new(Box::new(FixedClient::with_fix(None)));
        let diff = "diff --git a/src/lib.rs b/src/lib.rs\n+pub fn f() {}\n";
        let message = medic.suggest_commit_message(diff).await.unwrap();
        assert_eq!(message, "feat: canned message");
    }

    #[tokio::test]
    async fn test_fenced_commit_message_is_unwrapped() {
        let medic = ErrorMedic::new(Box::new(FixedClient {
            auto_fix: None,
            commit_message: "```text\nfix(runner): cap pipe reads\n```".to_string(),
        }));
        let message = medic.suggest_commit_message("+ line\n").await.unwrap();
        assert_eq!(message, "fix(runner): cap pipe reads");
    }

    #[tokio::test]
    async fn test_empty_diff_never_reaches_the_client() {
        // FailingClient would return Timeout; EmptyDiff proves the
        // pre-flight fired first.
        let medic = ErrorMedic::new(Box::new(FailingClient));
        assert!(matches!(
            medic.suggest_commit_message("  \n").await,
            Err(DiagnosisError::EmptyDiff)
        ));
    }

    #[tokio::test]
    async fn test_blank_model_output_is_invalid() {
        let medic = ErrorMedic::new(Box::new(FixedClient {
            auto_fix: None,
            commit_message: "```\n```".to_string(),
        }));
        assert!(matches!(
            medic.suggest_commit_message("+ line\n").await,
            Err(DiagnosisError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_fix_is_audited() {
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(AuditLogger::with_path(dir.path().join("history.log")).unwrap());
        let medic = ErrorMedic::new(Box::new(FixedClient::with_fix(Some(
            "git reset --hard HEAD~5".to_string(),
        ))))
        .with_audit(Arc::clone(&audit));

        let vetted = medic
            .diagnose(&network_error(), &PathBuf::from("/tmp/repo"))
            .await
            .unwrap();
        assert!(vetted.safe_fix.is_none());

        let log = std::fs::read_to_string(dir.path().join("history.log")).unwrap();
        assert!(log.contains("FIX-REJECTED"));
        assert!(log.contains("git reset --hard HEAD~5"));
    }
}
