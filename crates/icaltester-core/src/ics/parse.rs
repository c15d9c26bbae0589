//! Minimal VEVENT parser.

use tracing::{debug, trace};

use super::text::{unescape_text, unfold};
use crate::date::{exclusive_end, parse_wire_date};
use crate::event::{CalendarEvent, EventStatus};

/// Summary given to parsed events that carry no `SUMMARY` line.
pub const IMPORTED_SUMMARY: &str = "Imported";

/// Result of parsing a calendar document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCalendar {
    /// Events extracted from complete blocks, in document order.
    pub events: Vec<CalendarEvent>,
    /// Number of `VEVENT` blocks dropped for missing `UID`/`DTSTART`.
    pub dropped_blocks: usize,
}

/// Parses iCalendar text into normalized events.
///
/// Incomplete blocks are dropped silently; see [`parse_calendar`] for a
/// variant that reports how many were dropped.
pub fn parse_calendar_text(text: &str) -> Vec<CalendarEvent> {
    parse_calendar(text).events
}

/// Parses iCalendar text, reporting dropped blocks alongside the events.
pub fn parse_calendar(text: &str) -> ParsedCalendar {
    let unfolded = unfold(text);
    let mut parsed = ParsedCalendar::default();
    let mut current: Option<PendingEvent> = None;

    for raw_line in unfolded.lines() {
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            if current.is_some() {
                trace!("VEVENT opened inside an open block, restarting");
            }
            current = Some(PendingEvent::default());
            continue;
        }

        if line.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(pending) = current.take() {
                match pending.finish() {
                    Some(event) => parsed.events.push(event),
                    None => parsed.dropped_blocks += 1,
                }
            }
            continue;
        }

        let Some(pending) = current.as_mut() else {
            continue;
        };

        if let Some((key, value)) = split_property(line) {
            pending.apply(&key, value);
        }
    }

    if current.is_some() {
        trace!("VEVENT still open at end of input");
        parsed.dropped_blocks += 1;
    }

    if parsed.dropped_blocks > 0 {
        debug!(
            dropped = parsed.dropped_blocks,
            kept = parsed.events.len(),
            "Dropped incomplete VEVENT blocks"
        );
    }

    parsed
}

/// Splits `KEY[;PARAMS]:VALUE` into an uppercased key and the raw value.
fn split_property(line: &str) -> Option<(String, &str)> {
    let (left, value) = line.split_once(':')?;
    let key = left.split(';').next().unwrap_or(left);
    Some((key.to_ascii_uppercase(), value))
}

/// Fields collected while inside a `VEVENT` block.
#[derive(Debug, Default)]
struct PendingEvent {
    uid: Option<String>,
    summary: Option<String>,
    status: Option<EventStatus>,
    dtstart: Option<String>,
    dtend: Option<String>,
}

impl PendingEvent {
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "UID" => self.uid = Some(value.to_string()),
            "SUMMARY" => self.summary = Some(unescape_text(value)),
            "STATUS" => self.status = Some(EventStatus::from_ics(value)),
            "DTSTART" => self.dtstart = Some(value.to_string()),
            "DTEND" => self.dtend = Some(value.to_string()),
            _ => {}
        }
    }

    fn finish(self) -> Option<CalendarEvent> {
        let uid = self.uid.filter(|uid| !uid.is_empty())?;
        let start_raw = self.dtstart.filter(|raw| !raw.is_empty())?;

        let Some(start) = parse_wire_date(&start_raw) else {
            debug!(uid = %uid, value = %start_raw, "Unreadable DTSTART");
            return None;
        };
        let end = self.dtend.as_deref().and_then(parse_wire_date);

        Some(CalendarEvent {
            uid,
            start,
            end: exclusive_end(start, end),
            summary: self
                .summary
                .unwrap_or_else(|| IMPORTED_SUMMARY.to_string()),
            status: self.status.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::date::CalendarDate;

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn booking_feed() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Airbnb Inc//Hosting Calendar 0.8.8//EN\r\n\
         X-WR-CALNAME:Listing 123\r\n\
         BEGIN:VEVENT\r\n\
         DTSTAMP:20260101T101010Z\r\n\
         DTSTART;VALUE=DATE:20260110\r\n\
         DTEND;VALUE=DATE:20260113\r\n\
         SUMMARY:Reserved\r\n\
         UID:1418fb94e984-a@airbnb.com\r\n\
         END:VEVENT\r\n\
         BEGIN:VEVENT\r\n\
         DTSTART:20260201T150000Z\r\n\
         DTEND:20260204T110000Z\r\n\
         SUMMARY:Not available\r\n\
         STATUS:cancelled\r\n\
         UID:1418fb94e984-b@airbnb.com\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    }

    #[test]
    fn parses_blocks_in_order() {
        let events = parse_calendar_text(booking_feed());
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].uid, "1418fb94e984-a@airbnb.com");
        assert_eq!(events[0].start, date(2026, 1, 10));
        assert_eq!(events[0].end, date(2026, 1, 13));
        assert_eq!(events[0].summary, "Reserved");
        assert_eq!(events[0].status, EventStatus::Confirmed);

        assert_eq!(events[1].start, date(2026, 2, 1));
        assert_eq!(events[1].end, date(2026, 2, 4));
        assert_eq!(events[1].status, EventStatus::Cancelled);
    }

    #[test]
    fn missing_dtend_defaults_to_next_day() {
        let ics = "BEGIN:VEVENT\nUID:x\nDTSTART:20260301\nEND:VEVENT\n";
        let events = parse_calendar_text(ics);
        assert_eq!(events[0].end, date(2026, 3, 2));
        assert_eq!(events[0].summary, IMPORTED_SUMMARY);
    }

    #[test]
    fn non_increasing_dtend_is_bumped() {
        let same = "BEGIN:VEVENT\nUID:a\nDTSTART:20260301T090000Z\nDTEND:20260301T170000Z\nEND:VEVENT";
        let inverted = "BEGIN:VEVENT\nUID:b\nDTSTART:20260305\nDTEND:20260302\nEND:VEVENT";

        let a = parse_calendar_text(same);
        let b = parse_calendar_text(inverted);

        assert_eq!((a[0].start, a[0].end), (date(2026, 3, 1), date(2026, 3, 2)));
        assert_eq!((b[0].start, b[0].end), (date(2026, 3, 5), date(2026, 3, 6)));
    }

    #[test]
    fn incomplete_blocks_are_dropped_not_fatal() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   BEGIN:VEVENT\r\nSUMMARY:no uid\r\nDTSTART:20260101\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:no-start\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:bad-start\r\nDTSTART:soon\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:ok\r\nDTSTART:20260101\r\nEND:VEVENT\r\n\
                   END:VCALENDAR\r\n";
        let parsed = parse_calendar(ics);
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].uid, "ok");
        assert_eq!(parsed.dropped_blocks, 3);
    }

    #[test]
    fn unterminated_block_does_not_discard_earlier_events() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   BEGIN:VEVENT\r\nUID:a\r\nDTSTART:20260101\r\nEND:VEVENT\r\n\
                   BEGIN:VEVENT\r\nUID:b\r\nDTSTART:20260105\r\n\
                   END:VCALENDAR\r\n";
        let parsed = parse_calendar(ics);
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].uid, "a");
        assert_eq!(parsed.events[0].start, date(2026, 1, 1));
        assert_eq!(parsed.dropped_blocks, 1);
    }

    #[test]
    fn folded_and_escaped_summary() {
        let ics = "BEGIN:VEVENT\r\n\
                   UID:fold-1\r\n\
                   DTSTART;VALUE=DATE:20260401\r\n\
                   SUMMARY:Smith\\, John\\; party of 4 \r\n\
                   \x20arriving late\\nCall ahead\r\n\
                   END:VEVENT\r\n";
        let events = parse_calendar_text(ics);
        assert_eq!(
            events[0].summary,
            "Smith, John; party of 4 arriving late\nCall ahead"
        );
    }

    #[test]
    fn params_are_discarded_and_keys_case_insensitive() {
        let ics = "begin:vevent\n\
                   uid:lower@example.com\n\
                   dtstart;tzid=Europe/Paris:20260601T230000\n\
                   X-CUSTOM:ignored\n\
                   DESCRIPTION:has: colons\n\
                   end:vevent\n";
        let events = parse_calendar_text(ics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "lower@example.com");
        assert_eq!(events[0].start, date(2026, 6, 1));
    }

    #[test]
    fn content_outside_blocks_is_ignored() {
        let ics = "UID:outside\nDTSTART:20260101\nBEGIN:VEVENT\nUID:in\nDTSTART:20260102\nEND:VEVENT\nUID:after\n";
        let events = parse_calendar_text(ics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "in");
    }

    #[test]
    fn empty_input_yields_no_events() {
        assert!(parse_calendar_text("").is_empty());
        assert!(parse_calendar_text("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").is_empty());
    }
}
