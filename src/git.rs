//! Thin wrappers around the system `git` command.
//!
//! Using the system binary means SSH keys, credential helpers and anything
//! else configured in `~/.gitconfig` apply to every clone.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::{CancelToken, Cmd};

/// Options shared by every long-running git invocation.
#[derive(Debug, Clone, Default)]
pub struct GitRunOptions {
    /// Kill git if it runs longer than this.
    pub timeout: Option<Duration>,
    /// Kill git when this token is cancelled.
    pub cancel: Option<CancelToken>,
}

impl GitRunOptions {
    fn apply(&self, cmd: Cmd) -> Cmd {
        let cmd = cmd.timeout(self.timeout);
        match &self.cancel {
            Some(token) => cmd.cancel_on(token),
            None => cmd,
        }
    }
}

/// Shallow, recursive clone of `url` at `ref_name` into `target_dir`.
///
/// Runs `git clone --recursive --depth 1 --branch <ref> <url> <target_dir>`.
pub fn clone_shallow(
    url: &str,
    ref_name: &str,
    target_dir: &Path,
    options: &GitRunOptions,
) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let cmd = Cmd::new("git")
        .args(["clone", "--recursive", "--depth", "1", "--branch", ref_name, url])
        .arg_path(target_dir);
    let output = options.apply(cmd).run().map_err(|e| match e {
        Error::CommandFailed { status, .. } => Error::GitClone {
            url: url.to_string(),
            r#ref: ref_name.to_string(),
            message: status,
            hint: Some("Make sure git is installed and on PATH".to_string()),
        },
        other => other,
    })?;

    if !output.success() {
        let stderr = output.stderr_trimmed();

        // Provide helpful error message for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure you have access to the repository: SSH key added to ssh-agent, \
                 git credentials configured, or a personal access token set up"
                    .to_string(),
            )
        } else if stderr.contains("not found in upstream") {
            Some(format!("Check that '{}' is an existing tag or branch", ref_name))
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            r#ref: ref_name.to_string(),
            message: stderr.to_string(),
            hint,
        });
    }

    Ok(())
}

/// `git submodule update --init --recursive` inside `repo_dir`.
pub fn submodule_update(repo_dir: &Path, options: &GitRunOptions) -> Result<()> {
    let cmd = Cmd::new("git")
        .args(["submodule", "update", "--init", "--recursive"])
        .dir(repo_dir);
    run_checked(options.apply(cmd), repo_dir).map(|_| ())
}

/// The full hash of `HEAD` in `repo_dir`.
pub fn rev_parse_head(repo_dir: &Path) -> Result<String> {
    let cmd = Cmd::new("git").args(["rev-parse", "HEAD"]).dir(repo_dir);
    run_checked(cmd, repo_dir)
}

/// `git init` in `dir`, quietly.
pub fn init(dir: &Path) -> Result<()> {
    let cmd = Cmd::new("git").args(["init", "--quiet"]).dir(dir);
    run_checked(cmd, dir).map(|_| ())
}

/// Apply `patch` from inside `work_dir`, with paths prefixed by `directory`.
///
/// Runs `git apply --directory <directory> <patch>`. A rejected patch is a
/// `PatchApply` error carrying git's diagnostic.
pub fn apply_patch(work_dir: &Path, directory: &str, patch: &Path) -> Result<()> {
    let output = Cmd::new("git")
        .args(["apply", "--directory", directory])
        .arg_path(patch)
        .dir(work_dir)
        .run()?;

    if !output.success() {
        let message = match output.stderr_trimmed() {
            "" => format!("git apply exited with {}", output.status),
            stderr => stderr.to_string(),
        };
        return Err(Error::PatchApply {
            patch: patch.to_path_buf(),
            message,
        });
    }
    Ok(())
}

fn run_checked(cmd: Cmd, dir: &Path) -> Result<String> {
    let command = cmd.display();
    let output = cmd.run()?;
    if !output.success() {
        return Err(Error::GitCommand {
            command,
            dir: dir.to_path_buf(),
            stderr: output.stderr_trimmed().to_string(),
        });
    }
    Ok(output.stdout_trimmed().to_string())
}

/// Path of the git metadata directory of a checkout rooted at `dir`.
pub fn metadata_dir(dir: &Path) -> PathBuf {
    dir.join(".git")
}
