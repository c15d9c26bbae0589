//! Command implementations.
//!
//! Commands write to the writer they are given so they can be tested
//! without a terminal.

pub mod check;
pub mod codec;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod sync;

use std::io::Write;
use std::path::Path;

use icaltester_core::CalendarEvent;

use crate::error::ClientResult;

/// Prints parsed events, one per line or as a JSON array.
pub(crate) fn write_events(
    out: &mut dyn Write,
    events: &[CalendarEvent],
    json: bool,
) -> ClientResult<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, events)?;
        writeln!(out)?;
        return Ok(());
    }

    if events.is_empty() {
        writeln!(out, "No events.")?;
        return Ok(());
    }

    for event in events {
        writeln!(
            out,
            "{} -> {}  {:<9}  {}  ({})",
            event.start,
            event.end,
            event.status.as_str(),
            event.summary,
            event.uid
        )?;
    }
    Ok(())
}

/// Writes `text` to `path`, or to `out` when no path is given.
pub(crate) fn write_text(out: &mut dyn Write, path: Option<&Path>, text: &str) -> ClientResult<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            writeln!(out, "wrote {} bytes to {}", text.len(), path.display())?;
        }
        None => out.write_all(text.as_bytes())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use icaltester_core::{CalendarDate, EventStatus};

    fn event() -> CalendarEvent {
        CalendarEvent::new(
            "abc@host",
            CalendarDate::from_ymd_opt(2025, 3, 1).unwrap(),
            CalendarDate::from_ymd_opt(2025, 3, 4).unwrap(),
            "Guest",
            EventStatus::Cancelled,
        )
    }

    #[test]
    fn plain_listing() {
        let mut out = Vec::new();
        write_events(&mut out, &[event()], false).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2025-03-01 -> 2025-03-04  cancelled  Guest  (abc@host)\n"
        );
    }

    #[test]
    fn empty_listing() {
        let mut out = Vec::new();
        write_events(&mut out, &[], false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No events.\n");
    }

    #[test]
    fn json_listing() {
        let mut out = Vec::new();
        write_events(&mut out, &[event()], true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["uid"], "abc@host");
        assert_eq!(value[0]["start"], "2025-03-01");
        assert_eq!(value[0]["status"], "cancelled");
    }
}
