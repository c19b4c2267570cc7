//! # CLI Command Implementations
//!
//! Each subcommand of the `nextcloud-build` tool lives in its own file with:
//! - an `Args` struct that defines the command-specific options, derived using
//!   `clap`;
//! - an `execute` function that takes the parsed `Args` and calls into the
//!   `nextcloud_build` library.

pub mod build;
