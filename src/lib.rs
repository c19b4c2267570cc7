//! # Nextcloud Build Library
//!
//! This library assembles a Nextcloud release tree: it clones the server at a
//! pinned version, stamps its `version.php`, strips excluded files, assembles
//! the declared apps, applies patches and removes git metadata. It is driven
//! by the `nextcloud-build` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use nextcloud_build::path::gitignore_to_glob;
//! use nextcloud_build::config::BuildManifest;
//! use std::path::Path;
//!
//! // Exclusion rules use .gitignore syntax
//! assert_eq!(gitignore_to_glob("*.md"), "**/*.md");
//! assert_eq!(gitignore_to_glob("/build"), "build");
//!
//! // Parse a build manifest
//! let manifest = BuildManifest::parse(
//!     r#"{"repo": "https://github.com/nextcloud/server.git",
//!         "name": "server", "version": "v28.0.1", "exclude": ["*.md"]}"#,
//!     Path::new("28.json"),
//! )
//! .unwrap();
//! assert_eq!(manifest.exclude, vec!["*.md"]);
//! assert!(manifest.apps.is_empty());
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `defaults`)**: the JSON build manifest, per-app
//!   settings, `krankerl.toml` and `.nextcloudignore`, and where bundled
//!   manifests live.
//! - **Patterns and removal (`path`, `filesystem`)**: translation of
//!   `.gitignore` patterns to globs and deletion of their matches.
//! - **Version stamping (`version`)**: the `version.php` rewriter.
//! - **Subprocesses (`process`, `git`, `repository`)**: the `git` binary and
//!   shell commands, behind the `GitOperations` trait.
//! - **Phases (`phases`)**: the build pipeline, driven by
//!   `phases::orchestrator::execute`.

pub mod config;
pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod filesystem;
pub mod git;
pub mod logging;
pub mod path;
pub mod phases;
pub mod process;
pub mod repository;
pub mod version;

#[cfg(test)]
mod path_proptest;
