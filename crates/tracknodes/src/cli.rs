//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap.
//! Keeps argument parsing separate from execution logic.

use clap::Parser;
use std::path::PathBuf;
use tracknodes_common::config::Overrides;

/// Tracknodes CLI
#[derive(Parser, Debug)]
#[command(name = "tracknodes")]
#[command(
    about = "Keeps a history of node state and comment changes (Torque, PBS Pro, Slurm)",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Query the resource manager and record state changes before reporting
    #[arg(short, long)]
    pub update: bool,

    /// Database file (default: /var/lib/tracknodes/tracknodes.db or the user data dir)
    #[arg(long, value_name = "PATH")]
    pub dbfile: Option<PathBuf>,

    /// Resource manager command: pbsnodes or sinfo, by name or path
    #[arg(long, value_name = "CMD")]
    pub nodes_cmd: Option<String>,

    /// Config file (default: /etc/tracknodes/config.toml, then the user config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kill the resource manager command after this many seconds (0 = never)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show current failures instead of the history
    #[arg(long)]
    pub current: bool,

    /// Only report this node
    #[arg(long, value_name = "NAME")]
    pub node: Option<String>,

    /// Only report the newest N history events
    #[arg(long, value_name = "N", conflicts_with = "current")]
    pub limit: Option<usize>,

    /// Print the history as JSON
    #[arg(long, conflicts_with = "current")]
    pub json: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Values that override the config file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            nodes_cmd: self.nodes_cmd.clone(),
            dbfile: self.dbfile.clone(),
            verbose: self.verbose,
            command_timeout_secs: self.timeout,
        }
    }
}
