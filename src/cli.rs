//! Command-line interface, built on clap.
//!
//! Defines the [`Cli`] struct with subcommands [`Command`] (demo, tasks,
//! check) and global flags (--config, --settle-ms, --verbose).

use clap::{Parser, Subcommand};

/// skystep — guided tutorial sequencer for drone flight training.
#[derive(Debug, Parser)]
#[command(name = "skystep", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the tutorial configuration file (default: skystep.toml).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Settle delay override in milliseconds.
    #[arg(long, global = true)]
    pub settle_ms: Option<u64>,

    /// Enable detailed output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fly the configured tutorial with the built-in scripted pilot.
    Demo,

    /// Print the configured task sequence.
    Tasks,

    /// Validate a tutorial configuration file.
    Check {
        /// Path to the configuration file to validate.
        path: String,
    },
}
