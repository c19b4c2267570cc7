//! Pattern handling for exclusion rules.
//!
//! Exclusion rules are written in `.gitignore` syntax. They are translated to
//! plain glob patterns and resolved against a directory with the `glob` crate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::Result;

const NEGATION: char = '!';

/// Translate one `.gitignore` style pattern into a glob pattern.
///
/// Unanchored patterns get a `**/` prefix so they match at any depth, anchored
/// patterns (leading `/`) lose the slash and match from the search root. A
/// leading `!` is kept in front of the translated body.
pub fn gitignore_to_glob(pattern: &str) -> String {
    let (negation, body) = match pattern.strip_prefix(NEGATION) {
        Some(rest) => ("!", rest),
        None => ("", pattern),
    };

    match body.strip_prefix('/') {
        Some(anchored) => format!("{}{}", negation, anchored),
        None => format!("{}**/{}", negation, body),
    }
}

/// Translate a list of `.gitignore` style patterns, keeping their order.
pub fn gitignore_to_globs<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| gitignore_to_glob(p.as_ref()))
        .collect()
}

/// Parse the contents of an ignore file into its patterns.
///
/// Blank lines and `#` comments are dropped, trailing whitespace is trimmed
/// and a leading `\#` or `\!` escape is resolved.
pub fn parse_ignore_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            if line.starts_with("\\#") || line.starts_with("\\!") {
                line[1..].to_string()
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Resolve glob patterns against `cwd`.
///
/// Returns paths relative to `cwd` (absolute patterns outside `cwd` stay
/// absolute), in the order the globs produce them and without duplicates.
/// Patterns prefixed with `!` remove earlier matches. A trailing `/` restricts
/// a pattern to directories.
pub fn resolve_globs<S: AsRef<str>>(globs: &[S], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut matches = Vec::new();
    let mut negations = Vec::new();

    for glob_str in globs {
        let glob_str = glob_str.as_ref();
        if let Some(negated) = glob_str.strip_prefix(NEGATION) {
            negations.push(Pattern::new(negated.trim_end_matches('/'))?);
            continue;
        }

        let (pattern, dir_only) = match glob_str.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (glob_str, false),
        };
        if pattern.is_empty() {
            continue;
        }

        let full = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            let root = Pattern::escape(&cwd.to_string_lossy());
            format!("{}/{}", root.trim_end_matches('/'), pattern)
        };
        for entry in glob::glob(&full)? {
            let entry = entry?;
            if dir_only && !entry.is_dir() {
                continue;
            }
            let relative = match entry.strip_prefix(cwd) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => entry,
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            if seen.insert(relative.clone()) {
                matches.push(relative);
            }
        }
    }

    if negations.is_empty() {
        return Ok(matches);
    }

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    matches.retain(|path| {
        !negations
            .iter()
            .any(|negation| negation.matches_path_with(path, options))
    });
    Ok(matches)
}

/// Translate `.gitignore` style patterns and resolve them against `cwd`.
pub fn resolve_gitignore<S: AsRef<str>>(patterns: &[S], cwd: &Path) -> Result<Vec<PathBuf>> {
    resolve_globs(&gitignore_to_globs(patterns), cwd)
}
