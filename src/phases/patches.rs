//! Patch application.
//!
//! Patches come from three sources with a fixed precedence:
//!
//! 1. [`PatchSource::Included`] - the manifest's `includedPatches`, resolved
//!    against the tool home
//! 2. [`PatchSource::Manifest`] - the manifest's `patches`, resolved against
//!    the manifest's directory
//! 3. [`PatchSource::Invocation`] - `--patches` globs, resolved against the
//!    invocation directory
//!
//! Manifest-declared globs use `.gitignore` syntax; invocation globs are plain
//! globs. Within a source, patches keep the order the glob matcher returns.
//! Each patch applies against the tree left by the previous one, so they are
//! applied one at a time, and the first rejection stops the build.

use std::path::{Path, PathBuf};

use log::{info, trace};

use crate::config::BuildManifest;
use crate::error::Result;
use crate::path::{gitignore_to_globs, resolve_globs};
use crate::repository::GitOperations;

use super::BuildOptions;

/// Where a patch was declared. The derived order is the application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatchSource {
    Included,
    Manifest,
    Invocation,
}

/// Glob patterns from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchGlobs {
    pub source: PatchSource,
    /// Directory the patterns are resolved against.
    pub base_dir: PathBuf,
    pub patterns: Vec<String>,
}

impl PatchGlobs {
    fn globs(&self) -> Vec<String> {
        match self.source {
            PatchSource::Included | PatchSource::Manifest => gitignore_to_globs(&self.patterns),
            PatchSource::Invocation => self.patterns.clone(),
        }
    }
}

/// A resolved patch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub source: PatchSource,
    pub path: PathBuf,
}

/// The three patch sources of a build, in precedence order.
pub fn sources(manifest: &BuildManifest, options: &BuildOptions) -> Vec<PatchGlobs> {
    vec![
        PatchGlobs {
            source: PatchSource::Included,
            base_dir: options.tool_home.clone(),
            patterns: manifest.included_patches.clone(),
        },
        PatchGlobs {
            source: PatchSource::Manifest,
            base_dir: options.manifest_dir.clone(),
            patterns: manifest.patches.clone(),
        },
        PatchGlobs {
            source: PatchSource::Invocation,
            base_dir: options.invocation_dir.clone(),
            patterns: options.invocation_patches.clone(),
        },
    ]
}

/// Resolve every source to patch files, ordered by source precedence.
///
/// The order of `sets` does not matter; within one source the matcher's order
/// is kept.
pub fn collect(sets: &[PatchGlobs]) -> Result<Vec<Patch>> {
    let mut patches = Vec::new();
    for set in sets {
        if set.patterns.is_empty() {
            continue;
        }
        for path in resolve_globs(&set.globs(), &set.base_dir)? {
            patches.push(Patch {
                source: set.source,
                path: set.base_dir.join(path),
            });
        }
    }
    // stable: keeps matcher order within a source
    patches.sort_by_key(|patch| patch.source);
    Ok(patches)
}

/// Apply `patches` in order against the `directory` subtree of `work_dir`.
///
/// Returns the applied patch paths. The first rejected patch aborts; later
/// patches are not attempted and nothing is rolled back.
pub fn apply_all(
    git: &dyn GitOperations,
    patches: &[Patch],
    work_dir: &Path,
    directory: &str,
) -> Result<Vec<PathBuf>> {
    if !patches.is_empty() {
        info!("Setup complete. Applying patches");
    }

    let mut applied = Vec::with_capacity(patches.len());
    for patch in patches {
        trace!("PATCHES: Applying patch {}", patch.path.display());
        git.apply_patch(work_dir, directory, &patch.path)?;
        applied.push(patch.path.clone());
    }
    Ok(applied)
}
