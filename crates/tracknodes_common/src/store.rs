//! Node state store.
//!
//! SQLite-backed persistent storage for node failures.
//! Two tables, compatible with databases written by earlier tracknodes
//! releases:
//! - `CurrentFailedNodes`: one row per node currently believed unhealthy
//! - `NodeStates`: append-only history of every transition
//!
//! Every mutation commits before the next one starts. A run that dies half
//! way leaves a consistent prefix of changes, never a current row without
//! its history row.

use crate::error::{Result, TrackNodesError};
use crate::parsers::NodeSnapshotEntry;
use crate::state_codec::{decode, StateMask};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Format of the `Time` column (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted row for a node currently in failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFailure {
    pub name: String,
    /// None only for legacy rows written without a state
    pub state: Option<StateMask>,
    pub comment: String,
}

/// Append-only history row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub name: String,
    pub state: Option<StateMask>,
    pub comment: String,
    pub observed_at: NaiveDateTime,
}

impl HistoryEvent {
    pub fn state_text(&self) -> String {
        decode(self.state)
    }

    pub fn observed_at_text(&self) -> String {
        self.observed_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Filter for history queries
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Only events for this node
    pub node: Option<String>,
    /// At most this many events (newest first)
    pub limit: Option<usize>,
}

/// Storage operations the reconciliation engine needs.
pub trait NodeStateStore {
    /// All current failures, ordered by name
    fn current_failures(&self) -> Result<Vec<CurrentFailure>>;

    /// Current failure for one node
    fn current_failure(&self, name: &str) -> Result<Option<CurrentFailure>>;

    /// Insert a current failure and append its history event
    fn open_failure(&mut self, entry: &NodeSnapshotEntry, at: DateTime<Utc>) -> Result<()>;

    /// Overwrite a current failure and append its history event
    fn change_failure(&mut self, entry: &NodeSnapshotEntry, at: DateTime<Utc>) -> Result<()>;

    /// Append an online event and delete the current failure
    fn close_failure(&mut self, name: &str, at: DateTime<Utc>) -> Result<()>;

    /// History, newest first
    fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoryEvent>>;
}

/// SQLite implementation of [`NodeStateStore`]. The connection closes on drop.
pub struct SqliteNodeStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteNodeStore {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| TrackNodesError::StoreUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| unavailable(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let first_run = !path.exists();
        let conn = Connection::open(path).map_err(|e| unavailable(e.to_string()))?;

        let store = Self {
            conn,
            db_path: path.to_path_buf(),
        };
        store
            .init_schema()
            .map_err(|e| unavailable(e.to_string()))?;

        if first_run {
            info!("Created tracknodes database at {}", path.display());
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS CurrentFailedNodes (
                Name TEXT PRIMARY KEY,
                State INT,
                Comment TEXT
            );
            CREATE TABLE IF NOT EXISTS NodeStates (
                Name TEXT,
                State INT,
                Comment TEXT,
                Time TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_nodestates_time ON NodeStates(Time);
            CREATE INDEX IF NOT EXISTS idx_nodestates_name ON NodeStates(Name);
            "#,
        )
    }

    fn append_event(
        conn: &Connection,
        name: &str,
        state: StateMask,
        comment: &str,
        at: DateTime<Utc>,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO NodeStates (Name, State, Comment, Time) VALUES (?1, ?2, ?3, ?4)",
            params![name, state.bits(), comment, format_timestamp(at)],
        )
    }
}

impl NodeStateStore for SqliteNodeStore {
    fn current_failures(&self) -> Result<Vec<CurrentFailure>> {
        let mut stmt = self
            .conn
            .prepare("SELECT Name, State, Comment FROM CurrentFailedNodes ORDER BY Name")?;
        let rows = stmt
            .query_map([], current_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn current_failure(&self, name: &str) -> Result<Option<CurrentFailure>> {
        let row = self
            .conn
            .query_row(
                "SELECT Name, State, Comment FROM CurrentFailedNodes WHERE Name = ?1",
                params![name],
                current_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn open_failure(&mut self, entry: &NodeSnapshotEntry, at: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO CurrentFailedNodes (Name, State, Comment) VALUES (?1, ?2, ?3)",
            params![&entry.name, entry.state.bits(), &entry.comment],
        )?;
        Self::append_event(&tx, &entry.name, entry.state, &entry.comment, at)?;
        tx.commit()?;
        debug!("Recorded new failure for {}", entry.name);
        Ok(())
    }

    fn change_failure(&mut self, entry: &NodeSnapshotEntry, at: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE CurrentFailedNodes SET State = ?1, Comment = ?2 WHERE Name = ?3",
            params![entry.state.bits(), &entry.comment, &entry.name],
        )?;
        Self::append_event(&tx, &entry.name, entry.state, &entry.comment, at)?;
        tx.commit()?;
        debug!("Recorded changed failure for {}", entry.name);
        Ok(())
    }

    fn close_failure(&mut self, name: &str, at: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.transaction()?;
        Self::append_event(&tx, name, StateMask::ONLINE, "", at)?;
        tx.execute(
            "DELETE FROM CurrentFailedNodes WHERE Name = ?1",
            params![name],
        )?;
        tx.commit()?;
        debug!("Recorded recovery for {}", name);
        Ok(())
    }

    fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoryEvent>> {
        // rowid breaks ties between events stamped in the same second
        let mut sql = String::from("SELECT Name, State, Comment, Time FROM NodeStates");
        if query.node.is_some() {
            sql.push_str(" WHERE Name = ?1");
        }
        sql.push_str(" ORDER BY datetime(Time) DESC, rowid DESC");
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match &query.node {
            Some(node) => stmt.query_map(params![node], event_from_row)?,
            None => stmt.query_map([], event_from_row)?,
        };
        let events = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events.into_iter().flatten().collect())
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn state_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<StateMask>> {
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|v| {
        u32::try_from(v)
            .map(StateMask)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
    })
    .transpose()
}

fn current_from_row(row: &Row<'_>) -> rusqlite::Result<CurrentFailure> {
    Ok(CurrentFailure {
        name: row.get(0)?,
        state: state_from_column(row, 1)?,
        comment: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    })
}

/// None for rows whose `Time` is missing or unreadable; those are skipped
/// so one damaged legacy row cannot hide the rest of the history.
fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Option<HistoryEvent>> {
    let name: String = row.get(0)?;
    let time: Option<String> = row.get(3)?;
    let observed_at = match time
        .as_deref()
        .map(|t| NaiveDateTime::parse_from_str(t, TIMESTAMP_FORMAT))
    {
        Some(Ok(at)) => at,
        _ => {
            warn!("Skipping history row for {} with unreadable time {:?}", name, time);
            return Ok(None);
        }
    };

    Ok(Some(HistoryEvent {
        name,
        state: state_from_column(row, 1)?,
        comment: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        observed_at,
    }))
}
