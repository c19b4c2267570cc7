//! # Build Command Implementation
//!
//! This module implements the `build` subcommand, which assembles a complete
//! Nextcloud tree from a build manifest.
//!
//! ## Functionality
//!
//! - **Manifest Selection**: Uses `--custom-config` when given, otherwise the
//!   bundled `configs/<version>.json` of the tool home, where the version comes
//!   from `--nc-version` or the tool home's `VERSION` file.
//! - **Build**: Hands the manifest to the build orchestrator, which clones the
//!   server and its apps, applies exclusions and patches, and removes git
//!   metadata.
//!
//! The build directory must not exist yet; the command refuses to reuse one.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use nextcloud_build::config::BuildManifest;
use nextcloud_build::defaults;
use nextcloud_build::phases::{orchestrator, BuildOptions};
use nextcloud_build::repository::DefaultGitOperations;

/// Build Nextcloud and its apps
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build manifest to use instead of the bundled one.
    #[arg(long, value_name = "PATH")]
    pub custom_config: Option<PathBuf>,

    /// Directory in which to build Nextcloud. Must not exist yet.
    #[arg(long, value_name = "PATH", default_value = "./build")]
    pub build_dir: PathBuf,

    /// Nextcloud version to build. Selects the bundled manifest.
    ///
    /// Defaults to the version named in the tool home's VERSION file.
    #[arg(long, value_name = "VERSION")]
    pub nc_version: Option<String>,

    /// Execute the before_cmds of every app's krankerl.toml.
    ///
    /// Defaults to each app's "krankerlCommands" value, or false.
    #[arg(
        long,
        value_name = "true|false",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub exec_krankerl_cmds: Option<bool>,

    /// Comma separated list of globs for patches to apply after the bundled
    /// and manifest patches.
    #[arg(long, value_name = "GLOBS", default_value = "")]
    pub patches: String,

    /// Directory holding the bundled configs, patches and VERSION file.
    ///
    /// Defaults to the directory of the nextcloud-build executable.
    #[arg(long, value_name = "DIR", env = defaults::TOOL_HOME_ENV)]
    pub tool_home: Option<PathBuf>,

    /// Kill any clone, submodule update or command running longer than this.
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,
}

impl BuildArgs {
    /// Manifest path, falling back to the bundled manifest of the requested
    /// or default version.
    fn manifest_path(&self, tool_home: &Path) -> Result<PathBuf> {
        if let Some(path) = &self.custom_config {
            return Ok(path.clone());
        }
        let version = match &self.nc_version {
            Some(version) => version.clone(),
            None => defaults::default_version(tool_home)?,
        };
        Ok(defaults::bundled_manifest(tool_home, &version))
    }

    fn invocation_patches(&self) -> Vec<String> {
        split_globs(&self.patches)
    }
}

/// Execute the `build` command.
pub fn execute(args: BuildArgs) -> Result<()> {
    let invocation_dir = env::current_dir().context("Could not determine current directory")?;
    let tool_home = match &args.tool_home {
        Some(dir) => invocation_dir.join(dir),
        None => defaults::default_tool_home(),
    };

    let manifest_path = invocation_dir.join(args.manifest_path(&tool_home)?);
    info!("Using {}", manifest_path.display());
    let manifest = BuildManifest::from_file(&manifest_path)?;

    let options = BuildOptions {
        build_dir: args.build_dir.clone(),
        manifest_dir: manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| invocation_dir.clone()),
        tool_home,
        invocation_patches: args.invocation_patches(),
        invocation_dir,
        krankerl_override: args.exec_krankerl_cmds,
        command_timeout: args.command_timeout.map(Duration::from_secs),
    };

    let report = orchestrator::execute(&manifest, &options, &DefaultGitOperations)?;

    info!(
        "Built {} at {} with {} apps and {} patches",
        manifest.name,
        report.revision,
        report.apps.len(),
        report.patches_applied.len()
    );
    info!("Build complete!");
    Ok(())
}

/// Split a comma separated glob list, dropping empty entries.
fn split_globs(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|glob| !glob.is_empty())
        .map(str::to_string)
        .collect()
}
