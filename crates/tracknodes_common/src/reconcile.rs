//! Reconciliation of a fresh snapshot against recorded failures.
//!
//! Two passes, in this order:
//! 1. Recovery: every recorded failure whose node is absent from the
//!    snapshot gets an `online` history event and its current row removed.
//! 2. Failure: every snapshot entry is applied in order. Unknown nodes are
//!    opened; known nodes are only rewritten when the comment changed.
//!
//! The comment is the change signal. A node whose state flips while its
//! comment stays the same produces no write.
//!
//! Each step commits on its own. If a store write fails the remaining
//! steps are skipped and the error is returned, but earlier steps stay.

use crate::error::Result;
use crate::parsers::NodeSnapshotEntry;
use crate::store::NodeStateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Counts of what one reconciliation wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Nodes that returned to online
    pub recovered: usize,
    /// Nodes that entered failure
    pub failed: usize,
    /// Known failures whose comment changed
    pub changed: usize,
    /// Snapshot entries that matched the recorded failure
    pub unchanged: usize,
}

impl ReconcileSummary {
    /// Number of history events appended
    pub fn events(&self) -> usize {
        self.recovered + self.failed + self.changed
    }
}

/// Apply `snapshot` to `store`, stamping every event with `observed_at`.
pub fn reconcile<S: NodeStateStore>(
    store: &mut S,
    snapshot: &[NodeSnapshotEntry],
    observed_at: DateTime<Utc>,
) -> Result<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();

    let seen: HashSet<&str> = snapshot.iter().map(|e| e.name.as_str()).collect();

    for record in store.current_failures()? {
        if seen.contains(record.name.as_str()) {
            continue;
        }
        info!("{} is back online", record.name);
        store.close_failure(&record.name, observed_at)?;
        summary.recovered += 1;
    }

    for entry in snapshot {
        match store.current_failure(&entry.name)? {
            None => {
                info!("{} failed: {} '{}'", entry.name, entry.state, entry.comment);
                store.open_failure(entry, observed_at)?;
                summary.failed += 1;
            }
            Some(record) if record.comment != entry.comment => {
                info!(
                    "{} changed: {} '{}'",
                    entry.name, entry.state, entry.comment
                );
                store.change_failure(entry, observed_at)?;
                summary.changed += 1;
            }
            Some(_) => {
                debug!("{} unchanged", entry.name);
                summary.unchanged += 1;
            }
        }
    }

    Ok(summary)
}
