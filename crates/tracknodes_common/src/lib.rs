//! Tracknodes common library
//!
//! Samples HPC node health from the cluster resource manager (Torque,
//! PBS Pro or Slurm) and keeps a durable history of node failures.

pub mod command_exec;
pub mod config;
pub mod error;
pub mod history;
pub mod locator;
pub mod parsers;
pub mod reconcile;
pub mod resource_manager;
pub mod state_codec;
pub mod store;
pub mod tracker;

pub use error::{Result, TrackNodesError};
pub use parsers::{NodeSnapshotEntry, ParseError, ParsedOutput};
pub use reconcile::{reconcile, ReconcileSummary};
pub use resource_manager::{ResourceManager, ResourceManagerKind};
pub use state_codec::{decode, encode, StateMask};
pub use store::{CurrentFailure, HistoryEvent, HistoryQuery, NodeStateStore, SqliteNodeStore};
