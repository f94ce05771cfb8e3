pub mod whitelist;

pub use whitelist::{ArgShape, FixWhitelist, SafeCommand, WhitelistPattern};

/// Characters that carry meaning to a shell. None of them ever appear in
/// a legitimate fix command, so a single occurrence anywhere rejects the
/// whole proposal.
pub(crate) const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '<', '>', '`', '$', '(', ')', '"', '\'', '\\', '\n', '\r',
];
