//! Log verbosity and logger initialisation.
//!
//! Progress messages are tagged LOW, MEDIUM or HIGH. A message prints when its
//! tag is at most the configured verbosity (1-3). The tags map onto `log`
//! levels so the library can use the ordinary macros:
//!
//! | tag    | macro     | printed at verbosity |
//! |--------|-----------|----------------------|
//! | LOW    | `info!`   | 1, 2, 3              |
//! | MEDIUM | `debug!`  | 2, 3                 |
//! | HIGH   | `trace!`  | 3                    |
//!
//! Warnings and errors are always printed.

use std::fmt;
use std::str::FromStr;

use log::LevelFilter;

/// Configured log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Stage transitions only.
    #[default]
    Low = 1,
    /// Per-app progress.
    Medium = 2,
    /// Every deleted path and applied patch.
    High = 3,
}

impl Verbosity {
    /// The `log` level filter that lets exactly this verbosity's messages through.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Low => LevelFilter::Info,
            Verbosity::Medium => LevelFilter::Debug,
            Verbosity::High => LevelFilter::Trace,
        }
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Verbosity::Low),
            "2" => Ok(Verbosity::Medium),
            "3" => Ok(Verbosity::High),
            other => Err(format!("Unknown verbosity '{}'. Use: 1, 2, or 3", other)),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Initialise `env_logger` for the given verbosity.
///
/// `RUST_LOG` still wins when set. Calling this more than once is harmless;
/// later calls are ignored.
pub fn init(verbosity: Verbosity) {
    let _ = env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
