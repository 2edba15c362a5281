// Public modules
pub mod assets;
pub mod build;
pub mod composer;
pub mod config;
pub mod confirm;
pub mod context;
pub mod credential;
pub mod db;
pub mod error;
pub mod git;
pub mod hooks;
pub mod installer;
pub mod manifest;
pub mod materialize;
pub mod output;
pub mod platform;
pub mod process;
pub mod project;
pub mod prompt;
pub mod shell;

// Internal modules - not part of public API
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use output::{BuildReport, ItemReport, ItemStatus, StageReport};
