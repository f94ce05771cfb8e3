use crate::security::SHELL_METACHARACTERS;
use crate::services::{validate_file_path, validate_ref_name};
use std::fmt;

/// Shape of one argument slot in a safe-fix pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// Exact token, e.g. `fetch` or `--abort`.
    Literal(&'static str),
    /// A single file path; must not look like a flag.
    Path,
    /// A single branch/ref name.
    RefName,
    /// A single remote name.
    Remote,
}

/// One allowed command shape: `git` followed by exactly these slots.
///
/// Matching is one token per slot, so a chained or padded command can
/// never match; "no extra commands" is a property of the parser, not a
/// blacklist of substrings.
#[derive(Debug, Clone)]
pub struct WhitelistPattern {
    name: &'static str,
    shape: &'static [ArgShape],
}

impl WhitelistPattern {
    const fn new(name: &'static str, shape: &'static [ArgShape]) -> Self {
        Self { name, shape }
    }

    fn matches(&self, args: &[&str]) -> bool {
        args.len() == self.shape.len()
            && self
                .shape
                .iter()
                .zip(args)
                .all(|(shape, token)| shape_matches(shape, token))
    }
}

fn shape_matches(shape: &ArgShape, token: &str) -> bool {
    match shape {
        ArgShape::Literal(expected) => token == *expected,
        ArgShape::Path => validate_file_path(token).is_ok(),
        ArgShape::RefName | ArgShape::Remote => validate_ref_name(token).is_ok(),
    }
}

/// A proposed auto-fix that passed the whitelist: the vetted program and
/// argument vector, ready for argv execution with no shell in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeCommand {
    args: Vec<String>,
    pattern: &'static str,
}

impl SafeCommand {
    pub fn program(&self) -> &'static str {
        "git"
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Name of the pattern that admitted this command.
    pub fn pattern(&self) -> &'static str {
        self.pattern
    }
}

impl fmt::Display for SafeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.args.join(" "))
    }
}

use ArgShape::{Literal, Path, RefName, Remote};

/// The closed set of auto-fix shapes the diagnosis pipeline may surface
/// as executable. Deliberately small and non-destructive: no `--force`,
/// no `--hard`, nothing that rewrites published history.
///
/// Adding a pattern requires security review.
static SAFE_FIX_PATTERNS: &[WhitelistPattern] = &[
    WhitelistPattern::new("fetch", &[Literal("fetch")]),
    WhitelistPattern::new("fetch-remote", &[Literal("fetch"), Remote]),
    WhitelistPattern::new("pull", &[Literal("pull")]),
    WhitelistPattern::new("pull-rebase", &[Literal("pull"), Literal("--rebase")]),
    WhitelistPattern::new("pull-remote-branch", &[Literal("pull"), Remote, RefName]),
    WhitelistPattern::new(
        "pull-rebase-remote-branch",
        &[Literal("pull"), Literal("--rebase"), Remote, RefName],
    ),
    WhitelistPattern::new("stash", &[Literal("stash")]),
    WhitelistPattern::new("stash-pop", &[Literal("stash"), Literal("pop")]),
    WhitelistPattern::new("merge-abort", &[Literal("merge"), Literal("--abort")]),
    WhitelistPattern::new("rebase-abort", &[Literal("rebase"), Literal("--abort")]),
    WhitelistPattern::new(
        "cherry-pick-abort",
        &[Literal("cherry-pick"), Literal("--abort")],
    ),
    WhitelistPattern::new(
        "unstage-all",
        &[Literal("restore"), Literal("--staged"), Literal(".")],
    ),
    WhitelistPattern::new(
        "discard-worktree",
        &[Literal("checkout"), Literal("--"), Literal(".")],
    ),
    WhitelistPattern::new("undo-last-commit", &[Literal("reset"), Literal("HEAD~1")]),
    WhitelistPattern::new("stage-file", &[Literal("add"), Literal("--"), Path]),
    WhitelistPattern::new(
        "push-set-upstream",
        &[Literal("push"), Literal("-u"), Remote, RefName],
    ),
    WhitelistPattern::new(
        "create-switch-branch",
        &[Literal("switch"), Literal("-c"), RefName],
    ),
];

/// Validates AI-proposed auto-fix commands against the closed pattern set.
///
/// The proposed text is untrusted regardless of source. Anything that
/// fails here is dropped from the result entirely; there is no degraded
/// "almost safe" outcome.
#[derive(Debug, Clone, Default)]
pub struct FixWhitelist;

impl FixWhitelist {
    pub fn new() -> Self {
        Self
    }

    /// Check a proposed command. `None` means no safe fix is available
    /// and the caller must drop the auto-fix affordance.
    pub fn sanitize(&self, proposed: &str) -> Option<SafeCommand> {
        let proposed = proposed.trim();
        if proposed.is_empty() {
            return None;
        }

        // Metacharacters disqualify the whole command before any shape
        // matching, so a second command smuggled into an argument can
        // never ride along with an otherwise-matching prefix.
        if proposed.chars().any(|c| SHELL_METACHARACTERS.contains(&c)) {
            return None;
        }

        let tokens: Vec<&str> = proposed.split_whitespace().collect();
        let (program, args) = tokens.split_first()?;
        if *program != "git" {
            return None;
        }

        SAFE_FIX_PATTERNS
            .iter()
            .find(|pattern| pattern.matches(args))
            .map(|pattern| SafeCommand {
                args: args.iter().map(|s| s.to_string()).collect(),
                pattern: pattern.name,
            })
    }
}
