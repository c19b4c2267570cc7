//! Orchestrator for the complete build
//!
//! Runs the stages listed in the [`phases`](super) module docs in order.
//! Only the app stage is concurrent; every other stage sees the tree the
//! previous stage left behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::{resolve_apps, AppPlan, BuildManifest};
use crate::error::{Error, Result};
use crate::filesystem::{remove_listed, remove_matching};
use crate::git::metadata_dir;
use crate::process::CancelToken;
use crate::repository::GitOperations;
use crate::version::{self, VersionOverrides};

use super::{apps, patches, BuildOptions};

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// `<build_dir>/<name>`, the assembled tree.
    pub source_dir: PathBuf,
    /// Commit hash of the main source checkout.
    pub revision: String,
    /// Names of the assembled apps.
    pub apps: Vec<String>,
    /// Patches applied, in application order.
    pub patches_applied: Vec<PathBuf>,
}

/// Execute the complete build.
///
/// 1. Refuse to start if the build directory exists
/// 2. Clone the main source, update its submodules and read its revision
/// 3. Rewrite `version.php`
/// 4. Remove the manifest's `exclude` patterns
/// 5. Assemble all apps concurrently
/// 6. Initialise a repository in the build directory and apply patches
/// 7. Remove the git metadata of the build directory and the main source
///
/// Any failure aborts the build and leaves the build directory as it is.
pub fn execute(
    manifest: &BuildManifest,
    options: &BuildOptions,
    git: &dyn GitOperations,
) -> Result<BuildReport> {
    let build_dir = options.build_dir.as_path();
    if build_dir.exists() {
        return Err(Error::BuildDirExists {
            path: build_dir.to_path_buf(),
        });
    }

    // Validate app declarations before touching the filesystem
    let source_dir = build_dir.join(&manifest.name);
    let plans = resolve_apps(manifest, &source_dir, options.krankerl_override)?;

    fs::create_dir_all(build_dir)?;

    info!("Cloning {} at {}", manifest.repo, manifest.version);
    let git_options = options.git_options(None);
    git.clone_shallow(&manifest.repo, &manifest.version, &source_dir, &git_options)?;
    debug!("Updating submodules");
    git.submodule_update(&source_dir, &git_options)?;
    let revision = git.head_revision(&source_dir)?;
    debug!("Revision: {}", revision);

    info!("Updating {}", version::VERSION_FILE);
    rewrite_version_file(&source_dir, &revision, manifest)?;

    let removed = remove_matching(&manifest.exclude, &source_dir)?;
    debug!("exclude removed {} paths", removed);

    if !plans.is_empty() {
        info!("Setting up {} apps", plans.len());
        assemble_apps(&plans, git, options)?;
    }

    git.init(build_dir)?;
    let sources = patches::sources(manifest, options);
    let to_apply = patches::collect(&sources)?;
    let patches_applied = patches::apply_all(git, &to_apply, build_dir, &manifest.name)?;

    info!("Cleaning up");
    remove_listed(
        &[metadata_dir(Path::new("")), metadata_dir(Path::new(&manifest.name))],
        build_dir,
    )?;

    Ok(BuildReport {
        source_dir,
        revision,
        apps: plans.into_iter().map(|plan| plan.name).collect(),
        patches_applied,
    })
}

fn rewrite_version_file(source_dir: &Path, revision: &str, manifest: &BuildManifest) -> Result<()> {
    let path = source_dir.join(version::VERSION_FILE);
    let original = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let overrides = VersionOverrides {
        version_string: manifest.version_string.clone(),
        update_channel: manifest.update_channel.clone(),
    };
    fs::write(&path, version::rewrite(&original, revision, &overrides)?)?;
    Ok(())
}

/// Assemble every app at once, one thread per app.
///
/// Clones are network bound, so the pool is sized to the app count rather
/// than the CPU count of the global rayon pool.
///
/// The first failure cancels the remaining apps. The error reported is the
/// first one that is not itself a cancellation.
fn assemble_apps(plans: &[AppPlan], git: &dyn GitOperations, options: &BuildOptions) -> Result<()> {
    if plans.is_empty() {
        return Ok(());
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(plans.len())
        .thread_name(|index| format!("app-{}", index))
        .build()
        .map_err(io::Error::other)?;

    let cancel = CancelToken::new();
    let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());

    pool.install(|| {
        plans.par_iter().for_each(|plan| {
            if let Err(e) = apps::assemble(plan, git, options, &cancel) {
                cancel.cancel();
                errors
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(e);
            }
        })
    });

    let errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
    let mut first_cancelled = None;
    for e in errors {
        if !e.is_cancelled() {
            return Err(e);
        }
        first_cancelled.get_or_insert(e);
    }
    match first_cancelled {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
