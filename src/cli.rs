// src/cli.rs

//! CLI argument parsing using `clap`.

use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{Profile, TargetType};

/// Command-line arguments for `reconpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reconpipe",
    version,
    about = "Run a staged reconnaissance pipeline over external recon tools.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Recon.toml", global = true)]
    pub config: String,

    /// Path to the SQLite database.
    #[arg(long, value_name = "PATH", default_value = "recon.db", global = true)]
    pub db: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RECONPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register (or reuse) a target, run a job and stream its events as JSON
    /// lines. Ctrl-C stops the job.
    Run {
        /// Domain, IP address, CIDR range or organisation name.
        target: String,

        #[arg(long = "type", value_name = "TYPE", default_value = "domain", value_parser = TargetType::from_str)]
        target_type: TargetType,

        #[arg(long, value_name = "PROFILE", default_value = "standard-external", value_parser = Profile::from_str)]
        profile: Profile,

        /// Display name for a newly created target (defaults to the value).
        #[arg(long)]
        name: Option<String>,

        /// Tag for a newly created target; may be repeated.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Free-form notes stored with a newly created target.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Print the persisted summary of a job.
    Status { job_id: String },

    /// Show where each recon tool was found.
    Tools,

    /// Show which stages would run, without running anything.
    Plan {
        #[arg(value_parser = TargetType::from_str)]
        target_type: TargetType,

        #[arg(value_parser = Profile::from_str, default_value = "standard-external")]
        profile: Profile,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
