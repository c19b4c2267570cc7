//! # Error Handling
//!
//! This module defines the centralized error type for `nextcloud-build`. It
//! uses the `thiserror` library to create an `Error` enum covering every
//! failure the build pipeline can surface, with enough context (URLs, refs,
//! paths, commands, stderr) to diagnose a failed build without re-running it.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one failure class
//!   of the pipeline:
//!   - precondition failures (`BuildDirExists`, `AppConflict`, `ToolHome`),
//!   - acquisition failures (`GitClone`, `GitCommand`),
//!   - transformation failures (`PatchApply`),
//!   - subprocess failures (`CommandFailed`, `CommandTimeout`, `Cancelled`),
//!   - input failures (`ConfigRead`, `ConfigParse` and the wrapped parser errors).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Every variant maps to a process exit code through [`Error::exit_code`], so
//! the binary never has to inspect error messages to decide how to exit.

use std::path::PathBuf;

use thiserror::Error;

use crate::exit_codes;

/// Main error type for nextcloud-build operations
#[derive(Error, Debug)]
pub enum Error {
    /// The output build directory already exists. Nothing has been mutated.
    #[error("{} directory already exists. Please remove the directory before beginning", path.display())]
    BuildDirExists { path: PathBuf },

    /// A manifest or descriptor file could not be read.
    #[error("Could not read {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest or descriptor file was read but is not valid.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error in {}: {message}{}", path.display(), hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        path: PathBuf,
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// Two app entries resolve to the same directory, or an app name is not a
    /// plain directory name.
    #[error("Invalid app declaration '{app}': {message}")]
    AppConflict { app: String, message: String },

    /// The tool home (bundled configs, patches and VERSION file) is unusable.
    #[error("Tool home error: {message}")]
    ToolHome { message: String },

    /// An error occurred while cloning a Git repository.
    ///
    /// Includes the repository URL, ref (branch/tag), error message, and an
    /// optional hint for resolution.
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command inside a checkout.
    #[error("Git command failed in {}: {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// A patch was rejected. The working tree is left as-is.
    #[error("PATCHES: Could not apply '{}'. {message}", patch.display())]
    PatchApply { patch: PathBuf, message: String },

    /// A shell command from `before_cmds` exited unsuccessfully.
    #[error("Command '{command}' failed in {} with {status}", dir.display())]
    CommandFailed {
        command: String,
        dir: PathBuf,
        status: String,
    },

    /// A subprocess exceeded the configured timeout and was killed.
    #[error("Command '{command}' timed out after {seconds}s")]
    CommandTimeout { command: String, seconds: u64 },

    /// Work was abandoned because a sibling task failed.
    #[error("Cancelled: {context}")]
    Cancelled { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// An error while walking glob matches, wrapped from `glob::GlobError`.
    #[error("Glob traversal error: {0}")]
    GlobWalk(#[from] glob::GlobError),
}

impl Error {
    /// The process exit code this error should produce.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BuildDirExists { .. } => exit_codes::BUILD_DIR_EXISTS,
            Error::PatchApply { .. } => exit_codes::PATCH_FAILED,
            _ => exit_codes::ERROR,
        }
    }

    /// Whether this error only reports that the task was cancelled by a sibling.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
