pub mod classifier;
pub mod parser;
pub mod path_guard;
pub mod runner;

// Re-export commonly used types
pub use classifier::classify;
pub use parser::{
    BranchEntry, CommitEntry, FileEntry, GraphEntry, RemoteEntry, StatusReport,
    parse_branches, parse_graph, parse_log, parse_remotes, parse_status,
};
pub use path_guard::{PathGuard, RepositoryContext};
pub use runner::{CommandResult, CommandRunner, CommandSpec, TIMEOUT_EXIT_CODE};
