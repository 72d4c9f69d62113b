//! Tracknodes - keeps a history of HPC node state and comment changes
//!
//! Run with `--update` from cron to sample the resource manager; run
//! without it to read the recorded history.

use clap::Parser;
use tracknodes::cli::Cli;
use tracknodes::errors::{exit_code, EXIT_SUCCESS};

fn main() {
    let cli = Cli::parse();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let code = match tracknodes::run(&cli, &mut out) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit_code(&e)
        }
    };

    std::process::exit(code);
}
