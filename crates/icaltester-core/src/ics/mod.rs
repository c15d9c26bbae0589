//! iCalendar (RFC 5545 subset) codec.
//!
//! The parser reads `VEVENT` blocks into [`CalendarEvent`](crate::CalendarEvent)s,
//! keeping only `UID`, `DTSTART`, `DTEND`, `SUMMARY` and `STATUS`. The
//! generator writes whole-day events with `VALUE=DATE` start/end lines and
//! CRLF terminators.

mod generate;
mod parse;
mod text;

pub use generate::{
    CalendarDocument, DEFAULT_PROD_ID, DEFAULT_SUMMARY, build_calendar_text,
    build_calendar_text_at,
};
pub use parse::{IMPORTED_SUMMARY, ParsedCalendar, parse_calendar, parse_calendar_text};
pub use text::{escape_text, unescape_text, unfold};
