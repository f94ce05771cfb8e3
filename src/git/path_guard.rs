use crate::error::{GitError, GitResult};
use std::path::{Component, Path, PathBuf};

/// How many parent directories `.git` discovery may walk before giving up.
/// Mirrors git's own upward search, but bounded.
pub const MAX_DISCOVERY_DEPTH: usize = 64;

/// A validated, canonical repository working-tree path.
///
/// Produced once per request by `PathGuard::resolve` and immutable for the
/// request's lifetime; every service call takes one of these instead of
/// relying on ambient working-directory state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryContext {
    path: PathBuf,
}

impl RepositoryContext {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Validates raw repository paths against a configured allowed root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    allowed_root: PathBuf,
}

impl PathGuard {
    /// Create a guard for the given root. The root itself is canonicalized
    /// here so later containment checks compare like with like.
    pub fn new<P: AsRef<Path>>(allowed_root: P) -> std::io::Result<Self> {
        Ok(Self {
            allowed_root: allowed_root.as_ref().canonicalize()?,
        })
    }

    /// Resolve a raw path into a `RepositoryContext`.
    ///
    /// Relative paths are joined to the allowed root. The result must
    /// canonicalize (symlinks and `..` resolved) to somewhere inside the
    /// root, and a `.git` directory must exist at or above it. A path that
    /// does not exist is judged lexically, so the guard never reads the
    /// filesystem outside the root.
    pub fn resolve<P: AsRef<Path>>(&self, raw: P) -> GitResult<RepositoryContext> {
        let raw = raw.as_ref();
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.allowed_root.join(raw)
        };

        let canonical = match joined.canonicalize() {
            Ok(path) => path,
            Err(_) => {
                let normalized = normalize_lexically(&joined);
                if normalized.starts_with(&self.allowed_root) {
                    // Inside the root but missing: nothing there to be a repo.
                    return Err(not_a_repository());
                }
                return Err(GitError::PathEscape { path: normalized });
            }
        };

        if !canonical.starts_with(&self.allowed_root) {
            return Err(GitError::PathEscape { path: canonical });
        }

        // Walk upward looking for .git, staying inside the allowed root.
        let mut current = canonical.as_path();
        for _ in 0..MAX_DISCOVERY_DEPTH {
            if !current.starts_with(&self.allowed_root) {
                break;
            }
            if current.join(".git").exists() {
                return Ok(RepositoryContext {
                    path: current.to_path_buf(),
                });
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(not_a_repository())
    }

    pub fn allowed_root(&self) -> &Path {
        &self.allowed_root
    }
}

fn not_a_repository() -> GitError {
    GitError::NotARepository {
        operation: "resolve".to_string(),
        stderr: String::new(),
    }
}

/// Collapse `.` and `..` segments without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
