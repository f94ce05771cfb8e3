pub mod audit;
pub mod config;
pub mod diagnosis;
pub mod error;
pub mod git;
pub mod security;
pub mod services;

// Re-export commonly used types for convenience
pub use diagnosis::{Diagnosis, DiagnosisClient, DiagnosisError, ErrorMedic, VettedDiagnosis};
pub use error::{AppError, AppResult, GitError, GitResult};
pub use git::{CommandResult, CommandRunner, CommandSpec, PathGuard, RepositoryContext};
pub use security::{FixWhitelist, SafeCommand};
