//! The build pipeline.
//!
//! ## Overview
//!
//! A build runs these stages in order, stopping at the first failure:
//! 1. Validate - the build directory must not exist yet
//! 2. Acquire - shallow clone of the server, submodules, revision hash
//! 3. Version - rewrite `version.php`
//! 4. Exclude - remove the manifest's `exclude` patterns from the server
//! 5. Apps - assemble every app concurrently ([`apps`])
//! 6. Patches - included, then manifest, then invocation patches ([`patches`])
//! 7. Cleanup - remove git metadata
//!
//! [`orchestrator::execute`] drives the stages. Everything a stage needs from
//! the command line travels in [`BuildOptions`]; nothing is read from global
//! state.

use std::path::PathBuf;
use std::time::Duration;

use crate::git::GitRunOptions;
use crate::process::CancelToken;

pub mod apps;
pub mod orchestrator;
pub mod patches;

/// Per-build settings that do not come from the manifest.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Output directory. Must not exist yet.
    pub build_dir: PathBuf,
    /// Directory of the manifest file; base for the manifest's `patches`.
    pub manifest_dir: PathBuf,
    /// Base for the manifest's `includedPatches`.
    pub tool_home: PathBuf,
    /// Base for `invocation_patches`.
    pub invocation_dir: PathBuf,
    /// Patch globs given on the command line.
    pub invocation_patches: Vec<String>,
    /// Overrides every app's `krankerlCommands` when set.
    pub krankerl_override: Option<bool>,
    /// Limit for each clone, submodule update and shell command.
    pub command_timeout: Option<Duration>,
}

impl BuildOptions {
    /// Options building into `build_dir`, with every other base directory set
    /// to the current directory and no overrides.
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            manifest_dir: PathBuf::from("."),
            tool_home: PathBuf::from("."),
            invocation_dir: PathBuf::from("."),
            invocation_patches: Vec::new(),
            krankerl_override: None,
            command_timeout: None,
        }
    }

    /// Git options for one task, tied to that task's cancel token.
    pub(crate) fn git_options(&self, cancel: Option<&CancelToken>) -> GitRunOptions {
        GitRunOptions {
            timeout: self.command_timeout,
            cancel: cancel.cloned(),
        }
    }
}
