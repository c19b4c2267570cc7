//! Process exit codes used by the `nextcloud-build` binary.
//!
//! - `0`: the build completed
//! - `1`: general failure (unreadable or malformed manifest, clone errors,
//!   failed `before_cmds`, ...)
//! - `2`: invalid command-line usage (reported by clap)
//! - `3`: the build directory already exists
//! - `4`: a patch could not be applied

/// The build completed.
pub const SUCCESS: i32 = 0;

/// Any failure without a more specific code.
pub const ERROR: i32 = 1;

/// Invalid command-line usage. clap exits with this code on its own.
pub const USAGE: i32 = 2;

/// The requested build directory already exists.
pub const BUILD_DIR_EXISTS: i32 = 3;

/// A patch was rejected.
pub const PATCH_FAILED: i32 = 4;
