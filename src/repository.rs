//! # Source Control Seam
//!
//! The build pipeline never calls `git` directly. It goes through the
//! [`GitOperations`] trait so that the orchestration logic (ordering, removal,
//! patch precedence, failure propagation) can be exercised in tests with mock
//! implementations that never touch the network.
//!
//! In the binary, [`DefaultGitOperations`] forwards every call to
//! [`crate::git`], which wraps the system `git` command.

use std::path::Path;

use crate::error::Result;
use crate::git::{self, GitRunOptions};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Shallow, recursive clone of `url` at `ref_name` into `target_dir`.
    fn clone_shallow(
        &self,
        url: &str,
        ref_name: &str,
        target_dir: &Path,
        options: &GitRunOptions,
    ) -> Result<()>;

    /// Initialise and update all submodules of the checkout at `repo_dir`.
    fn submodule_update(&self, repo_dir: &Path, options: &GitRunOptions) -> Result<()>;

    /// The revision hash checked out at `repo_dir`.
    fn head_revision(&self, repo_dir: &Path) -> Result<String>;

    /// Create an empty repository at `dir` so patches can be applied there.
    fn init(&self, dir: &Path) -> Result<()>;

    /// Apply `patch` from `work_dir`, rooted at the `directory` subtree.
    fn apply_patch(&self, work_dir: &Path, directory: &str, patch: &Path) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_shallow(
        &self,
        url: &str,
        ref_name: &str,
        target_dir: &Path,
        options: &GitRunOptions,
    ) -> Result<()> {
        git::clone_shallow(url, ref_name, target_dir, options)
    }

    fn submodule_update(&self, repo_dir: &Path, options: &GitRunOptions) -> Result<()> {
        git::submodule_update(repo_dir, options)
    }

    fn head_revision(&self, repo_dir: &Path) -> Result<String> {
        git::rev_parse_head(repo_dir)
    }

    fn init(&self, dir: &Path) -> Result<()> {
        git::init(dir)
    }

    fn apply_patch(&self, work_dir: &Path, directory: &str, patch: &Path) -> Result<()> {
        git::apply_patch(work_dir, directory, patch)
    }
}
