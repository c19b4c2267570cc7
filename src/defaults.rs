//! Default locations for bundled build inputs.
//!
//! The tool home is the directory that ships with `nextcloud-build`:
//!
//! ```text
//! <tool-home>/
//!   VERSION            default server version, e.g. "28"
//!   configs/<v>.json   bundled manifest per server version
//!   patches/...        patches referenced by "includedPatches"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the tool home.
pub const TOOL_HOME_ENV: &str = "NEXTCLOUD_BUILD_HOME";

/// File inside the tool home naming the default server version.
pub const VERSION_FILE: &str = "VERSION";

/// Directory inside the tool home holding the bundled manifests.
pub const CONFIGS_DIR: &str = "configs";

/// Returns the default tool home: the directory of the running executable.
///
/// Falls back to the current directory if the executable path cannot be
/// determined.
pub fn default_tool_home() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The server version named by `<tool_home>/VERSION`.
pub fn default_version(tool_home: &Path) -> Result<String> {
    let path = tool_home.join(VERSION_FILE);
    let contents = fs::read_to_string(&path).map_err(|e| Error::ToolHome {
        message: format!(
            "could not read {} ({}); pass --nc-version or --custom-config",
            path.display(),
            e
        ),
    })?;
    let version = contents.trim();
    if version.is_empty() {
        return Err(Error::ToolHome {
            message: format!("{} is empty", path.display()),
        });
    }
    Ok(version.to_string())
}

/// Path of the bundled manifest for `version`.
pub fn bundled_manifest(tool_home: &Path, version: &str) -> PathBuf {
    tool_home.join(CONFIGS_DIR).join(format!("{}.json", version))
}
