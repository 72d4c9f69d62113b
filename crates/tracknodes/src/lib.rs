//! Tracknodes - node failure history for HPC clusters
//!
//! The binary is a thin layer over `tracknodes_common`: resolve settings,
//! optionally run an update, then print a report.

pub mod cli;
pub mod errors;
pub mod logging;

use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, info};
use tracknodes_common::command_exec::SystemCommandRunner;
use tracknodes_common::config::{FileConfig, Settings};
use tracknodes_common::history::{history_json, is_broken_pipe, write_current, write_history};
use tracknodes_common::tracker::{open_store, run_update};
use tracknodes_common::{HistoryQuery, NodeStateStore};

use cli::Cli;

/// Execute one invocation, writing the report to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let file_config = FileConfig::load(cli.config.as_deref())?;
    let config_source = file_config.source.clone();
    let settings = Settings::resolve(cli.overrides(), file_config);
    logging::init(settings.verbose);
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    debug!("Settings: {:?}", settings);

    if cli.update {
        let runner = SystemCommandRunner::new(settings.command_timeout);
        let report = run_update(&settings, &runner).context("Update failed")?;
        info!(
            "Update from {} recorded {} history event(s), {} output line(s) skipped",
            report.sample.manager.command.display(),
            report.summary.events(),
            report.sample.skipped
        );
    }

    let store = open_store(&settings)?;
    let written = if cli.current {
        let mut records = store.current_failures()?;
        if let Some(node) = &cli.node {
            records.retain(|r| &r.name == node);
        }
        write_current(out, &records)
    } else {
        let query = HistoryQuery {
            node: cli.node.clone(),
            limit: cli.limit,
        };
        let events = store.history(&query)?;
        if cli.json {
            write_json(out, &history_json(&events)?)
        } else {
            write_history(out, &events)
        }
    };

    match written {
        Err(e) if is_broken_pipe(&e) => Ok(()),
        other => other.context("Failed to write report"),
    }
}

fn write_json<W: Write>(out: &mut W, json: &str) -> io::Result<()> {
    writeln!(out, "{}", json)?;
    out.flush()
}
