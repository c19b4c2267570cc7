//! # Build Manifest Schema and Parsing
//!
//! This module defines the data structures for the three kinds of input a build
//! reads, and the logic that turns them into typed values:
//!
//! - **`BuildManifest`**: the JSON manifest describing the server checkout, the
//!   exclusion rules, the patches and the apps to assemble.
//! - **`AppManifest`**: one entry of the manifest's `apps` map.
//! - **`PackagingDescriptor`**: an app's own `krankerl.toml`, if it has one.
//!
//! An app's `.nextcloudignore` is a plain pattern list, read with
//! [`load_ignore_file`].
//!
//! Before assembly starts, every `AppManifest` is resolved into an immutable
//! [`AppPlan`] with all defaults filled in, so app tasks never look at the
//! root manifest again.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::path::parse_ignore_file;

/// File name of an app's packaging descriptor.
pub const PACKAGING_DESCRIPTOR: &str = "krankerl.toml";

/// File name of an app's ignore file.
pub const IGNORE_FILE: &str = ".nextcloudignore";

/// Default apps directory, relative to the server checkout.
pub const DEFAULT_APPS_DIR: &str = "apps";

/// The root build manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    /// URL of the server repository.
    pub repo: String,
    /// Directory name of the server checkout inside the build directory.
    pub name: String,
    /// Tag or branch of the server to build. Also the default app version.
    pub version: String,
    /// Replacement for the version string in `version.php`.
    #[serde(default)]
    pub version_string: Option<String>,
    /// Replacement for the update channel in `version.php`.
    #[serde(default)]
    pub update_channel: Option<String>,
    /// Patterns removed from the server checkout.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Patterns removed from every app.
    #[serde(default)]
    pub global_exclude: Vec<String>,
    /// Patch globs, relative to the manifest's directory.
    #[serde(default)]
    pub patches: Vec<String>,
    /// Patch globs, relative to the tool home.
    #[serde(default)]
    pub included_patches: Vec<String>,
    /// Apps keyed by app id.
    #[serde(default)]
    pub apps: BTreeMap<String, AppManifest>,
}

/// What to do with an app directory that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovePolicy {
    /// Delete it, then run the remaining assembly steps.
    Continue,
    /// Delete it and stop. When there is nothing to delete, assembly
    /// carries on as if `remove` were not set.
    Only,
}

/// One entry of the manifest's `apps` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    /// Repository to clone the app from.
    #[serde(default)]
    pub repo: Option<String>,
    /// Tag or branch to clone. Defaults to the manifest version.
    #[serde(default)]
    pub version: Option<String>,
    /// Apps directory, relative to the server checkout.
    #[serde(default)]
    pub apps_dir: Option<PathBuf>,
    /// App-specific exclusion patterns, applied after `globalExclude`.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// `"continue"`, any other truthy value, or falsy.
    #[serde(default, deserialize_with = "deserialize_remove")]
    pub remove: Option<RemovePolicy>,
    /// Run the `before_cmds` of the app's `krankerl.toml`.
    #[serde(default)]
    pub krankerl_commands: Option<bool>,
    /// Shell commands to run in the app directory before exclusions.
    #[serde(default, rename = "before_cmds")]
    pub before_cmds: Vec<String>,
}

fn deserialize_remove<'de, D>(deserializer: D) -> std::result::Result<Option<RemovePolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    let policy = match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s == "continue" => Some(RemovePolicy::Continue),
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        _ => Some(RemovePolicy::Only),
    };
    Ok(policy)
}

/// An app's `krankerl.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PackagingDescriptor {
    #[serde(default)]
    pub package: Option<PackageSection>,
}

/// The `[package]` table of a `krankerl.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PackageSection {
    #[serde(default)]
    pub before_cmds: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl BuildManifest {
    /// Read and parse the manifest at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse manifest JSON. `path` is only used in error messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let manifest: BuildManifest =
            serde_json::from_str(contents).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
                hint: Some(
                    "A manifest needs at least \"repo\", \"name\" and \"version\"".to_string(),
                ),
            })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if !is_plain_name(&self.name) {
            return Err(Error::ConfigParse {
                path: path.to_path_buf(),
                message: format!("\"name\" must be a plain directory name, got '{}'", self.name),
                hint: Some("Use something like \"server\"".to_string()),
            });
        }
        if self.version.trim().is_empty() {
            return Err(Error::ConfigParse {
                path: path.to_path_buf(),
                message: "\"version\" must not be empty".to_string(),
                hint: None,
            });
        }
        Ok(())
    }
}

impl PackagingDescriptor {
    /// Load `<app_dir>/krankerl.toml`. A missing file is `Ok(None)`.
    pub fn load(app_dir: &Path) -> Result<Option<Self>> {
        let path = app_dir.join(PACKAGING_DESCRIPTOR);
        let contents = match read_optional(&path)? {
            Some(contents) => contents,
            None => return Ok(None),
        };
        let descriptor = toml::from_str(&contents).map_err(|e| Error::ConfigParse {
            path,
            message: e.to_string(),
            hint: None,
        })?;
        Ok(Some(descriptor))
    }
}

/// Load the patterns of `<app_dir>/.nextcloudignore`. A missing file is `Ok(None)`.
pub fn load_ignore_file(app_dir: &Path) -> Result<Option<Vec<String>>> {
    Ok(read_optional(&app_dir.join(IGNORE_FILE))?.map(|contents| parse_ignore_file(&contents)))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A fully resolved app, ready to assemble.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPlan {
    /// App id; also the directory name.
    pub name: String,
    /// Absolute apps directory the app lives in.
    pub apps_dir: PathBuf,
    /// `<apps_dir>/<name>`.
    pub app_dir: PathBuf,
    pub repo: Option<String>,
    pub version: String,
    /// `globalExclude` followed by the app's own `exclude`.
    pub exclude: Vec<String>,
    pub remove: Option<RemovePolicy>,
    pub krankerl_commands: bool,
    pub before_cmds: Vec<String>,
}

/// Resolve every app of `manifest` against the server checkout at `source_dir`.
///
/// `krankerl_override` (from the command line) wins over each app's
/// `krankerlCommands`. Apps whose directories coincide or nest are rejected.
pub fn resolve_apps(
    manifest: &BuildManifest,
    source_dir: &Path,
    krankerl_override: Option<bool>,
) -> Result<Vec<AppPlan>> {
    let mut plans = Vec::with_capacity(manifest.apps.len());

    for (name, app) in &manifest.apps {
        if !is_plain_name(name) {
            return Err(Error::AppConflict {
                app: name.clone(),
                message: "app ids must be plain directory names".to_string(),
            });
        }

        let apps_dir = normalize(&source_dir.join(
            app.apps_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_APPS_DIR)),
        ));
        let app_dir = apps_dir.join(name);

        if let Some(other) = plans
            .iter()
            .find(|p: &&AppPlan| p.app_dir.starts_with(&app_dir) || app_dir.starts_with(&p.app_dir))
        {
            return Err(Error::AppConflict {
                app: name.clone(),
                message: format!(
                    "{} overlaps {} used by '{}'",
                    app_dir.display(),
                    other.app_dir.display(),
                    other.name
                ),
            });
        }

        let mut exclude = manifest.global_exclude.clone();
        exclude.extend(app.exclude.iter().cloned());

        plans.push(AppPlan {
            name: name.clone(),
            apps_dir,
            app_dir,
            repo: app.repo.clone(),
            version: app
                .version
                .clone()
                .unwrap_or_else(|| manifest.version.clone()),
            exclude,
            remove: app.remove,
            krankerl_commands: krankerl_override
                .or(app.krankerl_commands)
                .unwrap_or(false),
            before_cmds: app.before_cmds.clone(),
        });
    }

    Ok(plans)
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Lexically drop `.` and fold `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
