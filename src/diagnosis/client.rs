use crate::error::GitError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching a diagnosis
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("No API key configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded, retry after {0}s")]
    RateLimited(u64),

    #[error("Request timeout")]
    Timeout,

    #[error("No staged changes to describe")]
    EmptyDiff,

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A structured explanation of a git failure.
///
/// `auto_fix` is the raw command text proposed by the model. It is
/// untrusted until it has passed the whitelist; callers must never run
/// it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub explanation: String,
    pub steps: Vec<String>,
    pub auto_fix: Option<String>,
}

/// Trait for clients that can diagnose a classified git failure
#[async_trait]
pub trait DiagnosisClient: Send + Sync {
    /// Produce an explanation and remediation steps for a failure
    async fn diagnose(&self, error: &GitError) -> Result<Diagnosis, DiagnosisError>;

    /// Draft a commit message for a staged diff (the caller caps the diff
    /// size). Returns raw model text; the medic strips code fences.
    async fn generate_commit_message(&self, diff: &str) -> Result<String, DiagnosisError>;
}

/// Parse raw model output into a structured diagnosis.
///
/// Expected shape: a prose explanation, optional numbered steps, and at
/// most one `AUTO_FIX: <command>` line. Anything that deviates still
/// parses; missing pieces just come back empty.
pub fn parse_diagnosis(raw: &str) -> Diagnosis {
    let mut explanation_lines: Vec<String> = Vec::new();
    let mut explanation_done = false;
    let mut steps: Vec<String> = Vec::new();
    let mut auto_fix: Option<String> = None;

    for line in raw.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("AUTO_FIX:") {
            let candidate = rest.trim();
            // First AUTO_FIX line wins; an empty one means no fix.
            if auto_fix.is_none() && !candidate.is_empty() {
                auto_fix = Some(candidate.to_string());
            }
            continue;
        }

        if let Some(step) = strip_step_marker(trimmed) {
            steps.push(step.to_string());
            explanation_done = true;
            continue;
        }

        // Explanation is the leading prose paragraph, ending at the first
        // blank line or step marker once we have content.
        if trimmed.is_empty() {
            if !explanation_lines.is_empty() {
                explanation_done = true;
            }
        } else if !explanation_done {
            explanation_lines.push(trimmed.to_string());
        }
    }

    Diagnosis {
        explanation: explanation_lines.join(" "),
        steps,
        auto_fix,
    }
}

/// Remove a wrapping markdown code fence from model output.
///
/// Models fence commit messages despite instructions not to. The opening
/// fence (with any language tag) and closing fence are dropped; anything
/// in between is kept verbatim.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = text.split_once('\n').map_or("", |(_, body)| body);
    }
    if let Some(body) = text.trim_end().strip_suffix("```") {
        return body.trim().to_string();
    }
    text.trim().to_string()
}

/// Match a `1.` / `2)` style list marker and return the step text.
fn strip_step_marker(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    let step = rest.trim();
    if step.is_empty() { None } else { Some(step) }
}
