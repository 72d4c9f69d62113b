//! One sampling run: locate the resource manager, list nodes, reconcile.
//!
//! Locating and sampling happen before the store is opened, so a missing
//! or unsupported resource manager never touches the database.

use crate::command_exec::CommandRunner;
use crate::config::Settings;
use crate::error::Result;
use crate::parsers::NodeSnapshotEntry;
use crate::reconcile::{reconcile, ReconcileSummary};
use crate::resource_manager::{locate, ResourceManager};
use crate::store::{NodeStateStore, SqliteNodeStore};
use chrono::{DateTime, Utc};
use tracing::info;

/// Nodes reported by one invocation of the resource manager
#[derive(Debug, Clone)]
pub struct Sample {
    pub manager: ResourceManager,
    pub entries: Vec<NodeSnapshotEntry>,
    pub skipped: usize,
}

/// Outcome of an update run
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub sample: Sample,
    pub summary: ReconcileSummary,
}

/// Locate the resource manager and take a snapshot of its node list.
pub fn sample_cluster<R: CommandRunner>(nodes_cmd: Option<&str>, runner: &R) -> Result<Sample> {
    let manager = locate(nodes_cmd, runner)?;
    let parsed = manager.sample(runner)?;

    for err in &parsed.skipped {
        info!("Skipping {} output {}", manager.kind, err);
    }

    Ok(Sample {
        manager,
        entries: parsed.entries,
        skipped: parsed.skipped.len(),
    })
}

/// Reconcile a sample into an already opened store.
pub fn apply_sample<S: NodeStateStore>(
    store: &mut S,
    sample: Sample,
    observed_at: DateTime<Utc>,
) -> Result<UpdateReport> {
    let summary = reconcile(store, &sample.entries, observed_at)?;
    info!(
        "Reconciled {} node(s) from {}: {} failed, {} changed, {} recovered, {} unchanged",
        sample.entries.len(),
        sample.manager.kind,
        summary.failed,
        summary.changed,
        summary.recovered,
        summary.unchanged
    );
    Ok(UpdateReport { sample, summary })
}

/// Full update run against the configured database.
pub fn run_update<R: CommandRunner>(settings: &Settings, runner: &R) -> Result<UpdateReport> {
    let sample = sample_cluster(settings.nodes_cmd.as_deref(), runner)?;
    let mut store = open_store(settings)?;
    apply_sample(&mut store, sample, Utc::now())
}

/// Open the configured database.
pub fn open_store(settings: &Settings) -> Result<SqliteNodeStore> {
    info!("tracknodes database: {}", settings.db_path.display());
    SqliteNodeStore::open(&settings.db_path)
}
