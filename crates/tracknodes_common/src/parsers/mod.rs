//! Resource-manager output parsers.
//!
//! Each parser turns the captured stdout of one listing command into an
//! ordered list of node observations.
//!
//! # Supported Commands
//!
//! - `pbsnodes -nl` (Torque) and `pbsnodes -l` (PBS Pro): `name state [comment...]`
//! - `sinfo -dR` (Slurm): header line, then `reason user timestamp nodelist`
//!
//! A line that does not fit its grammar never fails the whole parse. It is
//! recorded as a [`ParseError`] next to the entries and the parser moves on.

pub mod pbsnodes;
pub mod sinfo;

pub use pbsnodes::parse_pbsnodes;
pub use sinfo::parse_sinfo;

use crate::state_codec::StateMask;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One node observation from a single sampling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshotEntry {
    pub name: String,
    pub state: StateMask,
    pub comment: String,
}

impl NodeSnapshotEntry {
    pub fn new(name: impl Into<String>, state: StateMask, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state,
            comment: comment.into(),
        }
    }
}

/// A line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// Line number in the command output (1-indexed)
    pub line_num: usize,
    /// Raw line text
    pub raw: String,
    /// Why parsing failed
    pub reason: ParseErrorReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorReason {
    /// Fewer tokens than the grammar requires
    MissingColumn { expected: usize, found: usize },
    /// Line does not match the expected row pattern
    MalformedRow,
}

impl ParseError {
    pub fn new(line_num: usize, raw: &str, reason: ParseErrorReason) -> Self {
        Self {
            line_num,
            raw: raw.to_string(),
            reason,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ParseErrorReason::MissingColumn { expected, found } => write!(
                f,
                "line {}: expected at least {} fields, found {}: {:?}",
                self.line_num, expected, found, self.raw
            ),
            ParseErrorReason::MalformedRow => {
                write!(f, "line {}: unrecognized row: {:?}", self.line_num, self.raw)
            }
        }
    }
}

/// Entries parsed from one command output, plus the lines that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub entries: Vec<NodeSnapshotEntry>,
    pub skipped: Vec<ParseError>,
}

impl ParsedOutput {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
