use crate::error::GitResult;
use crate::git::parser::{self, RemoteEntry};
use crate::git::path_guard::RepositoryContext;
use crate::git::runner::{CommandRunner, CommandSpec};
use crate::services::{run_checked, validate_ref_name};

/// Remote listing and transfer operations.
///
/// Remote names are always explicit arguments, never inferred from
/// ambient state, and are validated before becoming argv entries.
/// Authentication and network failures surface as their own error kinds
/// because they dominate real-world failure reports.
#[derive(Debug, Clone)]
pub struct RemoteService {
    runner: CommandRunner,
}

impl RemoteService {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    pub async fn list(&self, ctx: &RepositoryContext) -> GitResult<Vec<RemoteEntry>> {
        let spec = CommandSpec::new("remote-list", ["remote", "-v"]);
        let result = run_checked(&self.runner, ctx, spec).await?;
        Ok(parser::parse_remotes(&result.stdout))
    }

    /// Fetch (with prune) from the named remote; returns git's report.
    pub async fn fetch(&self, ctx: &RepositoryContext, remote: &str) -> GitResult<String> {
        validate_ref_name(remote)?;
        let spec = CommandSpec::new("fetch", ["fetch", "--prune", remote]);
        let result = run_checked(&self.runner, ctx, spec).await?;
        Ok(result.stdout)
    }

    pub async fn pull(
        &self,
        ctx: &RepositoryContext,
        remote: &str,
        branch: Option<&str>,
    ) -> GitResult<String> {
        validate_ref_name(remote)?;
        let mut args = vec!["pull".to_string(), remote.to_string()];
        if let Some(branch) = branch {
            validate_ref_name(branch)?;
            args.push(branch.to_string());
        }
        let result = run_checked(&self.runner, ctx, CommandSpec::new("pull", args)).await?;
        Ok(result.stdout)
    }

    pub async fn push(
        &self,
        ctx: &RepositoryContext,
        remote: &str,
        branch: Option<&str>,
    ) -> GitResult<String> {
        validate_ref_name(remote)?;
        let mut args = vec!["push".to_string(), remote.to_string()];
        if let Some(branch) = branch {
            validate_ref_name(branch)?;
            args.push(branch.to_string());
        }
        let result = run_checked(&self.runner, ctx, CommandSpec::new("push", args)).await?;
        Ok(result.stdout)
    }
}
