//! `parse` and `build`: the codec over local files.

use std::io::Write;
use std::path::Path;

use icaltester_core::{Booking, CalendarDocument, FeedEvent, build_calendar_text, parse_calendar};
use tracing::{debug, warn};

use super::{write_events, write_text};
use crate::error::{ClientError, ClientResult};

/// Parses a local `.ics` file and lists its events.
pub fn parse(out: &mut dyn Write, file: &Path, json: bool) -> ClientResult<()> {
    let bytes = std::fs::read(file)?;
    let text = String::from_utf8_lossy(&bytes);
    let parsed = parse_calendar(&text);
    if parsed.dropped_blocks > 0 {
        warn!(
            file = %file.display(),
            dropped = parsed.dropped_blocks,
            "Dropped incomplete VEVENT blocks"
        );
    }
    write_events(out, &parsed.events, json)
}

/// Generates a feed from a JSON array of bookings.
pub fn build(
    out: &mut dyn Write,
    name: &str,
    prod_id: Option<&str>,
    bookings_file: &Path,
    output: Option<&Path>,
) -> ClientResult<()> {
    let content = std::fs::read_to_string(bookings_file)?;
    let mut bookings: Vec<Booking> = serde_json::from_str(&content).map_err(|e| {
        ClientError::Input(format!("{}: {}", bookings_file.display(), e))
    })?;
    bookings.sort_by_key(|b| b.start_date);
    debug!(count = bookings.len(), "Loaded bookings");

    let mut document =
        CalendarDocument::new(name).with_events(bookings.iter().map(FeedEvent::from).collect());
    if let Some(prod_id) = prod_id {
        document = document.with_prod_id(prod_id);
    }

    write_text(out, output, &build_calendar_text(&document))
}
