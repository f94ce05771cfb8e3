use crate::diagnosis::client::{Diagnosis, DiagnosisClient, DiagnosisError, parse_diagnosis};
use crate::error::GitError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on raw stderr bytes embedded in the prompt.
const DEFAULT_MAX_PROMPT_BYTES: usize = 3000;

// Rate limiting: 10 requests per minute
const RATE_LIMIT_REQUESTS: usize = 10;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

const DIAGNOSIS_SYSTEM_INSTRUCTION: &str = "\
You are a git expert helping a developer understand why a git command failed.
Given the failure category and the raw error output, respond with:
- a short plain-language explanation of what went wrong (2-3 sentences)
- numbered remediation steps, one per line, like `1. ...`
- optionally, a single line `AUTO_FIX: <git command>` if one non-destructive
  git command would resolve the problem. Never suggest force pushes, hard
  resets, or anything that discards work. Omit the line if unsure.";

const COMMIT_SYSTEM_INSTRUCTION: &str = "\
You are an expert developer assistant. Given a git diff, write a concise,
professional commit message following Conventional Commits:
  <type>(<scope>): <short description>

  [optional body explaining why and what changed, not how]

Types: feat, fix, docs, style, refactor, perf, test, chore, ci, build.
Rules:
- Subject line: max 72 chars, imperative mood, no period.
- Body: wrap at 72 chars, explain motivation.
- Output ONLY the commit message, no explanation, no markdown fences.";

#[derive(Serialize)]
struct GeminiRequest {
    #[serde(rename = "system_instruction")]
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    max_prompt_bytes: usize,
    http_client: Client,
    // Rate limiting: track request timestamps
    request_times: Mutex<Vec<Instant>>,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, DiagnosisError> {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn with_model(api_key: String, model: String) -> Result<Self, DiagnosisError> {
        Self::build(api_key, model, REQUEST_TIMEOUT, DEFAULT_MAX_PROMPT_BYTES)
    }

    /// Build a client from the application config. `NotConfigured` when no
    /// API key is available from the environment or the config file.
    pub fn from_config(config: &crate::config::Config) -> Result<Self, DiagnosisError> {
        let api_key = config.get_api_key().ok_or(DiagnosisError::NotConfigured)?;
        Self::build(
            api_key,
            config.ai.model.clone(),
            Duration::from_secs(config.ai.request_timeout_seconds),
            config.ai.max_prompt_bytes,
        )
    }

    fn build(
        api_key: String,
        model: String,
        timeout: Duration,
        max_prompt_bytes: usize,
    ) -> Result<Self, DiagnosisError> {
        if api_key.trim().is_empty() {
            return Err(DiagnosisError::NotConfigured);
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DiagnosisError::Network)?;

        Ok(Self {
            api_key,
            model,
            max_prompt_bytes,
            http_client,
            request_times: Mutex::new(Vec::new()),
        })
    }

    pub fn with_prompt_cap(mut self, max_prompt_bytes: usize) -> Self {
        self.max_prompt_bytes = max_prompt_bytes;
        self
    }

    /// Check and enforce client-side rate limiting.
    fn check_rate_limit(&self) -> Result<(), DiagnosisError> {
        let now = Instant::now();
        let mut times = match self.request_times.lock() {
            Ok(times) => times,
            Err(poisoned) => poisoned.into_inner(),
        };

        times.retain(|&time| now.duration_since(time) < RATE_LIMIT_WINDOW);

        if times.len() >= RATE_LIMIT_REQUESTS {
            let oldest = times[0];
            let wait_time = RATE_LIMIT_WINDOW.saturating_sub(now.duration_since(oldest));
            return Err(DiagnosisError::RateLimited(wait_time.as_secs()));
        }

        times.push(now);
        Ok(())
    }

    fn build_prompt(&self, error: &GitError) -> String {
        let operation = error.operation().unwrap_or("unknown");
        let stderr = error.stderr().unwrap_or("");
        let stderr = truncate_at_boundary(stderr, self.max_prompt_bytes);

        format!(
            "Failure category: {}\nGit operation: {}\nError output:\n{}",
            error.kind_name(),
            operation,
            stderr
        )
    }

    async fn call_api(&self, system: &str, prompt: String) -> Result<String, DiagnosisError> {
        let request_body = GeminiRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: 512,
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DiagnosisError::Timeout
                } else {
                    DiagnosisError::Network(e)
                }
            })?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(DiagnosisError::NotConfigured);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DiagnosisError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DiagnosisError::ApiError(format!(
                "API returned status {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let api_response: GeminiResponse = serde_json::from_str(&body)?;

        api_response
            .candidates
            .and_then(|mut candidates| {
                if candidates.is_empty() {
                    None
                } else {
                    candidates.swap_remove(0).content
                }
            })
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| DiagnosisError::InvalidResponse("No candidates in response".to_string()))
    }
}

#[async_trait]
impl DiagnosisClient for GeminiClient {
    async fn diagnose(&self, error: &GitError) -> Result<Diagnosis, DiagnosisError> {
        self.check_rate_limit()?;

        let prompt = self.build_prompt(error);
        let raw = self.call_api(DIAGNOSIS_SYSTEM_INSTRUCTION, prompt).await?;

        Ok(parse_diagnosis(&raw))
    }

    async fn generate_commit_message(&self, diff: &str) -> Result<String, DiagnosisError> {
        if diff.trim().is_empty() {
            return Err(DiagnosisError::EmptyDiff);
        }
        self.check_rate_limit()?;

        let prompt = format!("Git diff to summarize:\n\n```diff\n{diff}\n```");
        self.call_api(COMMIT_SYSTEM_INSTRUCTION, prompt).await
    }
}

/// Truncate to at most `max_bytes`, backing up to a char boundary.
fn truncate_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
