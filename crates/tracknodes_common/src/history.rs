//! History and current-failure report rendering.

use crate::state_codec::decode;
use crate::store::{CurrentFailure, HistoryEvent};
use serde::Serialize;
use std::io::{self, Write};

pub const HISTORY_HEADER: &str = "-- History of Node Failures--";
pub const CURRENT_HEADER: &str = "-- Current Node Failures--";
pub const REPORT_FOOTER: &str = "-- --";

/// `{name} | {time} | {state} | '{comment}'`
pub fn format_event(event: &HistoryEvent) -> String {
    format!(
        "{} | {} | {} | '{}'",
        event.name,
        event.observed_at_text(),
        event.state_text(),
        event.comment
    )
}

/// `{name} | {state} | '{comment}'`
pub fn format_current(record: &CurrentFailure) -> String {
    format!(
        "{} | {} | '{}'",
        record.name,
        decode(record.state),
        record.comment
    )
}

/// Write the history report
pub fn write_history<W: Write>(out: &mut W, events: &[HistoryEvent]) -> io::Result<()> {
    write_report(out, HISTORY_HEADER, events.iter().map(format_event))
}

/// Write the current-failure report
pub fn write_current<W: Write>(out: &mut W, records: &[CurrentFailure]) -> io::Result<()> {
    write_report(out, CURRENT_HEADER, records.iter().map(format_current))
}

fn write_report<W, I>(out: &mut W, header: &str, lines: I) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = String>,
{
    writeln!(out, "{}", header)?;
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "{}", REPORT_FOOTER)?;
    writeln!(out, "    ")?;
    out.flush()
}

/// JSON shape of one history event
#[derive(Debug, Serialize)]
pub struct EventView<'a> {
    pub name: &'a str,
    pub state: Option<u32>,
    pub state_text: String,
    pub comment: &'a str,
    pub observed_at: String,
}

impl<'a> From<&'a HistoryEvent> for EventView<'a> {
    fn from(event: &'a HistoryEvent) -> Self {
        Self {
            name: &event.name,
            state: event.state.map(|s| s.bits()),
            state_text: event.state_text(),
            comment: &event.comment,
            observed_at: event.observed_at_text(),
        }
    }
}

/// History as pretty-printed JSON
pub fn history_json(events: &[HistoryEvent]) -> serde_json::Result<String> {
    let views: Vec<EventView<'_>> = events.iter().map(EventView::from).collect();
    serde_json::to_string_pretty(&views)
}

/// Whether an I/O error means the reader went away (e.g. piped into `head`)
pub fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}
