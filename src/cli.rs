//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use nextcloud_build::logging::{self, Verbosity};

use crate::commands;

/// Nextcloud Build - Assemble a Nextcloud release tree from a build manifest
#[derive(Parser, Debug)]
#[command(name = "nextcloud-build")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Log verbosity (1, 2 or 3)
    #[arg(
        short,
        long,
        global = true,
        value_name = "NUMBER",
        default_value = "1"
    )]
    verbosity: Verbosity,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build Nextcloud and its apps into a fresh build directory
    Build(commands::build::BuildArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        logging::init(self.verbosity);

        match self.command {
            Commands::Build(args) => commands::build::execute(args),
        }
    }
}
