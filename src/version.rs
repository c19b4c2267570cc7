//! # Version Descriptor Rewriting
//!
//! The server checkout carries a `version.php` holding the release metadata.
//! A release build replaces it with a trimmed copy in which:
//!
//! 1.  The version tuple and vendor lines are kept as they are.
//! 2.  The version string and update channel lines are kept, or have their
//!     quoted value replaced when an override is configured. An override may
//!     contain `{pre}`, which expands to the original value.
//! 3.  The build line gets `'<timestamp> <revision>'` as its value.
//! 4.  The upgrade compatibility block is copied verbatim up to the first blank
//!     line.
//!
//! Lines are located by marker token, not by position, and the output keeps
//! the order of the markers above. A marker missing from the input produces an
//! empty line and a warning rather than an error.
//!
//! This is pure text transformation; the caller reads and writes the file.

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use regex::{NoExpand, Regex};

use crate::error::Result;

/// File name of the version descriptor inside the server checkout.
pub const VERSION_FILE: &str = "version.php";

const PREAMBLE: &str = "<?php";
const VERSION_MARKER: &str = "$OC_Version";
const VERSION_STRING_MARKER: &str = "$OC_VersionString";
const CHANNEL_MARKER: &str = "$OC_Channel";
const VENDOR_MARKER: &str = "$vendor";
const BUILD_MARKER: &str = "$OC_Build";
const UPGRADE_MARKER: &str = "$OC_VersionCanBeUpgradedFrom";
const PRE_PLACEHOLDER: &str = "{pre}";
const QUOTED_LITERAL: &str = r#"'(.*)'|"(.*)""#;

/// Optional replacements for the version descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionOverrides {
    /// Replacement for the `$OC_VersionString` value.
    pub version_string: Option<String>,
    /// Replacement for the `$OC_Channel` value.
    pub update_channel: Option<String>,
}

/// Rewrite `original` for a build of `revision`, stamped with the current time.
pub fn rewrite(original: &str, revision: &str, overrides: &VersionOverrides) -> Result<String> {
    rewrite_at(original, revision, overrides, Utc::now())
}

/// Rewrite `original` for a build of `revision`, stamped with `built_at`.
pub fn rewrite_at(
    original: &str,
    revision: &str,
    overrides: &VersionOverrides,
    built_at: DateTime<Utc>,
) -> Result<String> {
    debug!("Creating {} file", VERSION_FILE);
    let quoted = Regex::new(QUOTED_LITERAL)?;
    let lines: Vec<&str> = original.split('\n').collect();
    let mut out = Vec::with_capacity(8);

    out.push(PREAMBLE.to_string());
    out.push(find_marker_line(&lines, VERSION_MARKER).to_string());
    out.push(replace_if_set(
        &quoted,
        find_marker_line(&lines, VERSION_STRING_MARKER),
        overrides.version_string.as_deref(),
    ));
    out.push(replace_if_set(
        &quoted,
        find_marker_line(&lines, CHANNEL_MARKER),
        overrides.update_channel.as_deref(),
    ));
    out.push(find_marker_line(&lines, VENDOR_MARKER).to_string());

    let stamp = format!(
        "{} {}",
        built_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        revision
    );
    out.push(replace_quoted(
        &quoted,
        find_marker_line(&lines, BUILD_MARKER),
        &stamp,
    ));

    match lines.iter().position(|line| has_marker(line, UPGRADE_MARKER)) {
        Some(start) => out.extend(
            lines[start..]
                .iter()
                .take_while(|line| !line.is_empty())
                .map(|line| line.to_string()),
        ),
        None => warn!(
            "{}: no line contains {}, upgrade block left out",
            VERSION_FILE, UPGRADE_MARKER
        ),
    }

    let mut text = out.join("\n");
    text.push('\n');
    debug!("{} file created", VERSION_FILE);
    Ok(text)
}

/// First line containing `marker` as a whole token, or `""` when there is none.
fn find_marker_line<'a>(lines: &[&'a str], marker: &str) -> &'a str {
    match lines.iter().find(|line| has_marker(line, marker)) {
        Some(line) => line,
        None => {
            warn!(
                "{}: no line contains {}, writing an empty line",
                VERSION_FILE, marker
            );
            ""
        }
    }
}

/// Whether `line` contains `marker` not immediately followed by an identifier
/// character (so `$OC_Version` does not match `$OC_VersionString`).
fn has_marker(line: &str, marker: &str) -> bool {
    line.match_indices(marker).any(|(index, _)| {
        line[index + marker.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

fn replace_if_set(quoted: &Regex, line: &str, replacement: Option<&str>) -> String {
    match replacement {
        Some(replacement) => replace_quoted(quoted, line, replacement),
        None => line.to_string(),
    }
}

/// Replace the quoted string literal in `line` with `'replacement'`.
///
/// `{pre}` in `replacement` expands to the current quoted value. Lines without
/// a quoted literal are returned unchanged.
fn replace_quoted(quoted: &Regex, line: &str, replacement: &str) -> String {
    let current = quoted
        .captures(line)
        .and_then(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map_or("", |m| m.as_str());
    let value = replacement.replace(PRE_PLACEHOLDER, current);
    quoted
        .replace_all(line, NoExpand(&format!("'{}'", value)))
        .into_owned()
}
