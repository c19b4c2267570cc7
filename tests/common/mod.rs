//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_manifest(&manifests::server_only("file:///srv"));
//!     fixture.command().arg("build").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    #[allow(unused_imports)]
    pub use super::GitRepo;
    pub use super::TestFixture;
}

/// Build manifest snippets for testing.
#[allow(dead_code)]
pub mod manifests {
    /// Manifest building only the server from `repo` at tag `v1`.
    pub fn server_only(repo: &str) -> String {
        format!(
            r#"{{"repo": "{}", "name": "server", "version": "v1", "exclude": ["*.md"]}}"#,
            repo
        )
    }

    /// Invalid JSON for error testing.
    pub const INVALID_JSON: &str = r#"{"repo": "#;

    /// Valid JSON that lacks the required "version".
    pub const MISSING_VERSION: &str = r#"{"repo": "https://example.test/server.git", "name": "server"}"#;
}

/// `version.php` as shipped by a server checkout.
#[allow(dead_code)]
pub const VERSION_PHP: &str = "<?php
$OC_Version = array(28,0,1,1);
$OC_VersionString = '28.0.1';
$OC_Edition = '';
$OC_Channel = 'git';
$OC_VersionCanBeUpgradedFrom = [
  'nextcloud' => [
    '27.1' => true,
  ],
];

$OC_Build = '';
$vendor = 'nextcloud';
";

/// A test fixture that provides a temporary directory with an optional
/// manifest. The directory doubles as the tool home of commands it creates.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `manifest.json` with the given content.
    pub fn with_manifest(self, content: &str) -> Self {
        self.with_file("manifest.json", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir.path().join("manifest.json")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command running in this fixture's directory, with the
    /// directory as tool home.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("nextcloud-build");
        cmd.current_dir(self.path())
            .env("NEXTCLOUD_BUILD_HOME", self.path())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Create a `build` command using the fixture's manifest.
    #[allow(dead_code)]
    pub fn build_command(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("build").arg("--custom-config").arg(self.manifest_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A local git repository for builds that need a real `git` binary.
#[allow(dead_code)]
pub struct GitRepo {
    dir: PathBuf,
}

#[allow(dead_code)]
impl GitRepo {
    /// Initialise a repository at `dir` containing `files`, commit them and
    /// tag the commit `tag`.
    pub fn create(dir: &Path, files: &[(&str, &str)], tag: &str) -> Self {
        std::fs::create_dir_all(dir).expect("Failed to create repository directory");
        let repo = Self {
            dir: dir.to_path_buf(),
        };
        repo.git(&["init", "--quiet"]);
        for (path, content) in files {
            let path = dir.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        repo.git(&["add", "--all"]);
        repo.git(&["commit", "--quiet", "-m", "initial"]);
        repo.git(&["tag", tag]);
        repo
    }

    /// `file://` URL of the repository, so shallow clones work.
    pub fn url(&self) -> String {
        format!("file://{}", self.dir.display())
    }

    /// Hash of the tagged commit.
    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
            .args(args)
            .current_dir(&self.dir)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_manifest() {
        let fixture = TestFixture::new().with_manifest("{}");
        assert!(fixture.manifest_path().exists());
    }

    #[test]
    fn test_manifests_are_valid_json() {
        let manifest = manifests::server_only("file:///srv/server");
        serde_json::from_str::<serde_json::Value>(&manifest).expect("Manifest should be valid JSON");
        serde_json::from_str::<serde_json::Value>(manifests::MISSING_VERSION).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(manifests::INVALID_JSON).is_err());
    }
}
