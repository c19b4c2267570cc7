//! Removal of excluded files and directories from the build tree.
//!
//! Deletion is idempotent: paths that no longer exist are skipped silently,
//! since an earlier pattern (or an earlier run) may already have removed them.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::trace;

use crate::error::Result;
use crate::path::resolve_gitignore;

/// Remove every path in `listed`, resolved relative to `cwd`.
///
/// Files and symbolic links are unlinked, directories are removed with their
/// full contents. Returns the number of paths actually removed.
pub fn remove_listed<P: AsRef<Path>>(listed: &[P], cwd: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in listed {
        let path = cwd.join(entry.as_ref());
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        trace!("Delete: Removing {}", path.display());
        let file_type = metadata.file_type();
        if file_type.is_file() || file_type.is_symlink() {
            fs::remove_file(&path)?;
        } else if file_type.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            // sockets, fifos and device nodes
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    Ok(removed)
}

/// Remove everything under `cwd` matched by `.gitignore` style `patterns`.
///
/// Returns the number of paths removed.
pub fn remove_matching<S: AsRef<str>>(patterns: &[S], cwd: &Path) -> Result<usize> {
    if patterns.is_empty() {
        return Ok(0);
    }
    let matches = resolve_gitignore(patterns, cwd)?;
    remove_listed(&matches, cwd)
}
