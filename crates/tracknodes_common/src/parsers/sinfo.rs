//! Parser for Slurm `sinfo -dR` output.
//!
//! ```text
//! REASON               USER      TIMESTAMP           NODELIST
//! broken ram           root      2017-01-02T09:09:82 n010
//! ```
//!
//! `sinfo -dR` only lists nodes that are down or drained, so every row is
//! recorded as `down` and the reason column becomes the comment.

use super::{NodeSnapshotEntry, ParseError, ParseErrorReason, ParsedOutput};
use crate::state_codec::encode;
use regex::Regex;
use std::sync::LazyLock;

/// `<reason> <user> <timestamp> <nodename>`, reason may contain spaces.
static SINFO_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)\s+([A-Za-z0-9_-]+)\s+([0-9T:-]+)\s+([A-Za-z0-9_-]+)\s*$")
        .expect("sinfo row pattern is valid")
});

/// State text synthesized for every row
const SINFO_STATE: &str = "down";

/// Parse `sinfo -dR` output. The first line is always treated as a header.
pub fn parse_sinfo(output: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let state = encode(SINFO_STATE);

    for (line_idx, line) in output.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        match SINFO_ROW.captures(line) {
            Some(caps) => {
                let reason = caps[1].trim();
                let node = &caps[4];
                parsed
                    .entries
                    .push(NodeSnapshotEntry::new(node, state, reason));
            }
            None => parsed.skipped.push(ParseError::new(
                line_idx + 1,
                line,
                ParseErrorReason::MalformedRow,
            )),
        }
    }

    parsed
}
