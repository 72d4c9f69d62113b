//! Parser for `pbsnodes -nl` (Torque) and `pbsnodes -l` (PBS Pro) output.
//!
//! Both list one node per line:
//! ```text
//! n001   down                maintenance window
//! n002   offline,job-exclusive
//! ```

use super::{NodeSnapshotEntry, ParseError, ParseErrorReason, ParsedOutput};
use crate::state_codec::encode;

/// Parse pbsnodes node-list output.
///
/// Token 0 is the node name, token 1 the state text, and any further tokens
/// joined by single spaces form the comment. Blank lines are ignored.
pub fn parse_pbsnodes(output: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();

    for (line_idx, line) in output.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [name, state, comment @ ..] => parsed.entries.push(NodeSnapshotEntry::new(
                *name,
                encode(state),
                comment.join(" "),
            )),
            _ => parsed.skipped.push(ParseError::new(
                line_idx + 1,
                line,
                ParseErrorReason::MissingColumn {
                    expected: 2,
                    found: fields.len(),
                },
            )),
        }
    }

    parsed
}
