//! Assembly of a single app inside the server checkout.
//!
//! Each app works only inside its own `<apps_dir>/<name>` subtree, which is
//! what lets the orchestrator run all apps at once on the rayon pool.

use std::path::Path;
use std::time::Duration;

use log::{debug, info, trace};

use crate::config::{self, AppPlan, PackagingDescriptor, RemovePolicy};
use crate::error::{Error, Result};
use crate::filesystem::{remove_listed, remove_matching};
use crate::process::{CancelToken, Cmd};
use crate::repository::GitOperations;

use super::BuildOptions;

/// Assemble one app.
///
/// Steps, each skipped when it has nothing to do:
/// 1. remove an existing copy (`remove`), stopping here unless `"continue"`;
///    an app with nothing to remove carries on with the other steps
/// 2. clone `repo` at `version` and update its submodules
/// 3. run the app's `before_cmds`
/// 4. apply `krankerl.toml`: its `before_cmds` when enabled, then its `exclude`
/// 5. apply `.nextcloudignore`
/// 6. remove the merged `exclude` patterns
///
/// `cancel` is checked between steps and while subprocesses run.
pub fn assemble(
    plan: &AppPlan,
    git: &dyn GitOperations,
    options: &BuildOptions,
    cancel: &CancelToken,
) -> Result<()> {
    let app = plan.name.as_str();
    let app_dir = plan.app_dir.as_path();

    if let Some(policy) = plan.remove {
        cancel.check(app)?;
        if remove_listed(&[app_dir], Path::new(""))? > 0 {
            info!("{}: Removed existing app directory", app);
            if policy == RemovePolicy::Only {
                debug!("{}: Removed, nothing else to do", app);
                return Ok(());
            }
        }
    }

    if let Some(repo) = &plan.repo {
        cancel.check(app)?;
        info!("{}: Cloning {} at {}", app, repo, plan.version);
        let git_options = options.git_options(Some(cancel));
        git.clone_shallow(repo, &plan.version, app_dir, &git_options)?;
        debug!("{}: Updating submodules", app);
        git.submodule_update(app_dir, &git_options)?;
    }

    if !plan.before_cmds.is_empty() {
        debug!("{}: Running before_cmds", app);
        run_commands(&plan.before_cmds, app_dir, options.command_timeout, cancel)?;
    }

    cancel.check(app)?;
    if let Some(descriptor) = PackagingDescriptor::load(app_dir)? {
        let package = descriptor.package.unwrap_or_default();
        if plan.krankerl_commands && !package.before_cmds.is_empty() {
            debug!("{}: Running {} before_cmds", app, config::PACKAGING_DESCRIPTOR);
            run_commands(&package.before_cmds, app_dir, options.command_timeout, cancel)?;
        }
        let removed = remove_matching(&package.exclude, app_dir)?;
        debug!(
            "{}: {} excludes removed {} paths",
            app,
            config::PACKAGING_DESCRIPTOR,
            removed
        );
    }

    cancel.check(app)?;
    if let Some(patterns) = config::load_ignore_file(app_dir)? {
        let removed = remove_matching(&patterns, app_dir)?;
        debug!("{}: {} removed {} paths", app, config::IGNORE_FILE, removed);
    }

    let removed = remove_matching(&plan.exclude, app_dir)?;
    debug!("{}: exclude removed {} paths", app, removed);

    info!("{}: Done", app);
    Ok(())
}

/// Run shell commands in order inside `dir`, stopping at the first failure.
fn run_commands(
    commands: &[String],
    dir: &Path,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<()> {
    for command in commands {
        trace!("Running '{}' in {}", command, dir.display());
        let output = Cmd::shell(command)
            .dir(dir)
            .inherit_stdio()
            .timeout(timeout)
            .cancel_on(cancel)
            .run()?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command.clone(),
                dir: dir.to_path_buf(),
                status: output.status.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::mock::{Call, MockGitOperations};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const REPO: &str = "https://example.test/calendar.git";

    fn plan(root: &Path) -> AppPlan {
        let apps_dir = root.join("apps");
        AppPlan {
            name: "calendar".to_string(),
            app_dir: apps_dir.join("calendar"),
            apps_dir,
            repo: None,
            version: "v4.0.0".to_string(),
            exclude: Vec::new(),
            remove: None,
            krankerl_commands: false,
            before_cmds: Vec::new(),
        }
    }

    fn write(path: PathBuf, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn run(plan: &AppPlan, git: &MockGitOperations) -> Result<()> {
        assemble(plan, git, &BuildOptions::new("unused"), &CancelToken::new())
    }

    #[test]
    fn test_remove_only_stops_after_removal() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.remove = Some(RemovePolicy::Only);
        plan.repo = Some(REPO.to_string());
        write(plan.app_dir.join("old.php"), "old");

        let git = MockGitOperations::new();
        run(&plan, &git).unwrap();

        assert!(!plan.app_dir.exists());
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_remove_continue_reclones_fresh() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.remove = Some(RemovePolicy::Continue);
        plan.repo = Some(REPO.to_string());
        write(plan.app_dir.join("stale.php"), "stale");

        let git = MockGitOperations::new().with_repo(REPO, &[("appinfo/info.xml", "<info/>")]);
        run(&plan, &git).unwrap();

        assert!(!plan.app_dir.join("stale.php").exists());
        assert!(plan.app_dir.join("appinfo/info.xml").exists());
        assert_eq!(
            git.calls(),
            vec![
                Call::Clone {
                    url: REPO.to_string(),
                    r#ref: "v4.0.0".to_string(),
                    target: plan.app_dir.clone(),
                },
                Call::SubmoduleUpdate(plan.app_dir.clone()),
            ]
        );
    }

    #[test]
    fn test_remove_without_existing_directory_still_clones() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.remove = Some(RemovePolicy::Only);
        plan.repo = Some(REPO.to_string());

        let git = MockGitOperations::new().with_repo(REPO, &[("appinfo/info.xml", "<info/>")]);
        run(&plan, &git).unwrap();

        assert!(plan.app_dir.join("appinfo/info.xml").exists());
        assert!(matches!(git.calls().first(), Some(Call::Clone { url, .. }) if url == REPO));
    }

    #[test]
    fn test_remove_replaces_plain_file() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.remove = Some(RemovePolicy::Continue);
        plan.repo = Some(REPO.to_string());
        write(plan.app_dir.clone(), "not a directory");

        let git = MockGitOperations::new().with_repo(REPO, &[("appinfo/info.xml", "<info/>")]);
        run(&plan, &git).unwrap();

        assert!(plan.app_dir.is_dir());
        assert!(plan.app_dir.join("appinfo/info.xml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_only_unlinks_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.remove = Some(RemovePolicy::Only);
        plan.repo = Some(REPO.to_string());
        fs::create_dir_all(&plan.apps_dir).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), &plan.app_dir).unwrap();

        let git = MockGitOperations::new();
        run(&plan, &git).unwrap();

        assert!(fs::symlink_metadata(&plan.app_dir).is_err());
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_cancelled_app_keeps_existing_directory() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.remove = Some(RemovePolicy::Continue);
        write(plan.app_dir.join("old.php"), "old");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = assemble(&plan, &MockGitOperations::new(), &BuildOptions::new("unused"), &cancel)
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(plan.app_dir.join("old.php").exists());
    }

    #[test]
    fn test_bundled_app_without_repo_only_excludes() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.exclude = vec!["tests/".to_string(), "*.md".to_string()];
        write(plan.app_dir.join("lib/App.php"), "<?php");
        write(plan.app_dir.join("tests/AppTest.php"), "<?php");
        write(plan.app_dir.join("README.md"), "# calendar");

        let git = MockGitOperations::new();
        run(&plan, &git).unwrap();

        assert!(plan.app_dir.join("lib/App.php").exists());
        assert!(!plan.app_dir.join("tests").exists());
        assert!(!plan.app_dir.join("README.md").exists());
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_ignore_file_and_packaging_excludes() {
        let temp = TempDir::new().unwrap();
        let plan = plan(temp.path());
        write(plan.app_dir.join("lib/App.php"), "<?php");
        write(plan.app_dir.join("src/main.js"), "js");
        write(plan.app_dir.join("build/tools.sh"), "sh");
        write(plan.app_dir.join("lib/build/keep.php"), "<?php");
        write(plan.app_dir.join(".nextcloudignore"), "# sources\n/src\n");
        write(
            plan.app_dir.join("krankerl.toml"),
            "[package]\nexclude = [\"/build\"]\n",
        );

        run(&plan, &MockGitOperations::new()).unwrap();

        assert!(plan.app_dir.join("lib/App.php").exists());
        assert!(plan.app_dir.join("lib/build/keep.php").exists());
        assert!(!plan.app_dir.join("src").exists());
        assert!(!plan.app_dir.join("build").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_before_cmds_run_in_app_directory() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        fs::create_dir_all(&plan.app_dir).unwrap();
        plan.before_cmds = vec!["echo one > first.txt".to_string(), "cp first.txt second.txt".to_string()];

        run(&plan, &MockGitOperations::new()).unwrap();

        assert_eq!(
            fs::read_to_string(plan.app_dir.join("second.txt")).unwrap().trim(),
            "one"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_before_cmd_stops_assembly() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        fs::create_dir_all(&plan.app_dir).unwrap();
        write(plan.app_dir.join("README.md"), "# calendar");
        plan.before_cmds = vec!["exit 3".to_string(), "touch never.txt".to_string()];
        plan.exclude = vec!["*.md".to_string()];

        let err = run(&plan, &MockGitOperations::new()).unwrap_err();

        assert!(matches!(err, Error::CommandFailed { ref command, .. } if command == "exit 3"));
        assert!(!plan.app_dir.join("never.txt").exists());
        // later steps did not run
        assert!(plan.app_dir.join("README.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_krankerl_commands_only_when_enabled() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        write(
            plan.app_dir.join("krankerl.toml"),
            "[package]\nbefore_cmds = [\"touch built.txt\"]\n",
        );

        run(&plan, &MockGitOperations::new()).unwrap();
        assert!(!plan.app_dir.join("built.txt").exists());

        plan.krankerl_commands = true;
        run(&plan, &MockGitOperations::new()).unwrap();
        assert!(plan.app_dir.join("built.txt").exists());
    }

    #[test]
    fn test_cancelled_app_does_not_clone() {
        let temp = TempDir::new().unwrap();
        let mut plan = plan(temp.path());
        plan.repo = Some(REPO.to_string());
        let git = MockGitOperations::new().with_repo(REPO, &[]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = assemble(&plan, &git, &BuildOptions::new("unused"), &cancel).unwrap_err();

        assert!(err.is_cancelled());
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_malformed_packaging_descriptor_fails() {
        let temp = TempDir::new().unwrap();
        let plan = plan(temp.path());
        write(plan.app_dir.join("krankerl.toml"), "[package\n");

        let err = run(&plan, &MockGitOperations::new()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
