//! Engine module: CLI, external collaborators and path tools

pub mod arg_parser;
pub mod cli;
pub mod indexer;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{RunStatus, handle_run};
pub use indexer::{GraphIndexer, IndexerApp};
pub use report::{check_fail_build, print_results};
pub use scanner::{GraphScanner, RemoteScanner};
pub use tools::{PathMatcher, repo_path_from_target, root_path_for_pattern};
